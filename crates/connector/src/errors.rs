//! Error types for the connector engine.

use protocol::{CodecError, ParseSourceIdError, TransportError};
use thiserror::Error;

/// Rejected configuration. Returned from
/// [`crate::ConnectorConfigBuilder::build`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source id is not an unsigned decimal `u64`.
    #[error("invalid source id '{value}': {source}")]
    InvalidSource {
        value: String,
        #[source]
        source: ParseSourceIdError,
    },

    #[error("stargate address must not be empty")]
    EmptyAddress,

    #[error("heartbeat interval must be greater than zero")]
    InvalidHeartbeat,
}

/// Fatal error from [`crate::Connector::serve`].
///
/// Session-level failures are retried and never surface here.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The transport could not build a channel for the configured endpoint.
    #[error("failed to dial stargate at '{address}': {source}")]
    Dial {
        address: String,
        #[source]
        source: TransportError,
    },
}

/// Why a session ended abnormally or a request task failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading the next inbound frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] TransportError),

    /// Writing a response frame failed.
    #[error("send failed: {0}")]
    Send(#[source] TransportError),

    /// A result row could not be encoded.
    #[error("failed to encode row: {0}")]
    Encode(#[from] CodecError),

    /// A request task panicked or was aborted.
    #[error("request task failed: {0}")]
    Task(#[source] tokio::task::JoinError),
}
