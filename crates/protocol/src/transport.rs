//! Transport ports.
//!
//! The engine never opens sockets itself. A [`Transport`] turns the configured
//! [`Endpoint`] into a [`Channel`]; the supervisor opens one [`SessionStream`]
//! per connection attempt on that channel. Implementations live in the
//! `transport` crate.

use async_trait::async_trait;
use thiserror::Error;

use crate::identifiers::{SecretToken, SourceId};
use crate::message::{InboundMessage, OutboundMessage};

/// Whether the stream is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportSecurity {
    #[default]
    Tls,
    Plaintext,
}

/// Where to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub security: TransportSecurity,
}

/// Authentication attached to every stream opened on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthMetadata {
    token: SecretToken,
    source: SourceId,
}

impl AuthMetadata {
    pub const AUTHORIZATION: &'static str = "authorization";
    pub const SOURCE: &'static str = "source";

    pub fn new(token: SecretToken, source: SourceId) -> Self {
        Self { token, source }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// `Bearer <token>`.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }

    /// Metadata entries as sent on the wire.
    pub fn entries(&self) -> [(&'static str, String); 2] {
        [
            (Self::AUTHORIZATION, self.authorization()),
            (Self::SOURCE, self.source.to_string()),
        ]
    }
}

/// Transport failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint address could not be understood.
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The transport cannot satisfy the requested configuration.
    #[error("unsupported transport configuration: {0}")]
    Unsupported(String),

    /// The remote end could not be reached.
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    /// The remote end rejected the credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// A frame could not be encoded or decoded.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed while sending.
    #[error("stream closed")]
    Closed,

    /// The call was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The call's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl TransportError {
    /// Cancellation and deadline expiry end a session cleanly rather than
    /// as a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Builds channels for an endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Prepares a channel. Failure here means the configuration can never
    /// work and is not retried.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Channel>, TransportError>;
}

/// A prepared connection target on which sessions are opened.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Opens one bidirectional stream carrying `metadata`.
    async fn open(&self, metadata: &AuthMetadata) -> Result<SessionStream, TransportError>;
}

/// Both halves of an open stream.
pub struct SessionStream {
    pub sender: Box<dyn FrameSender>,
    pub receiver: Box<dyn FrameReceiver>,
}

impl std::fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStream").finish_non_exhaustive()
    }
}

/// Writing half of a stream. Each call sends one whole frame.
#[async_trait]
pub trait FrameSender: Send {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;
}

/// Reading half of a stream.
#[async_trait]
pub trait FrameReceiver: Send {
    /// Next frame, or `Ok(None)` once the remote end closed the stream.
    async fn recv(&mut self) -> Result<Option<InboundMessage>, TransportError>;
}
