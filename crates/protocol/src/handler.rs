//! The host application's side of the protocol.
//!
//! A connector implements [`Handler`]; the engine calls it once per inbound
//! request, possibly many times concurrently. Errors returned from a handler
//! are application data: the engine sends their text back to Stargate and
//! the session carries on.

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::CodecError;
use crate::identifiers::{MessageId, SourceId};
use crate::message::Plan;
use crate::schema::Table;
use crate::value::Value;

/// Error type handlers return. Only its `Display` text crosses the wire.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-request information passed to every handler call.
///
/// The future driving a handler call is dropped when the session it belongs
/// to ends; handlers observe cancellation that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    id: MessageId,
    source: SourceId,
}

impl RequestContext {
    pub fn new(id: MessageId, source: SourceId) -> Self {
        Self { id, source }
    }

    /// Id of the request being served.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Source this connector is registered as.
    pub fn source(&self) -> SourceId {
        self.source
    }
}

/// Capability supplied by the host application.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Liveness check. Return an error if the connector is not ready.
    async fn ping(&self, ctx: &RequestContext) -> Result<(), HandlerError>;

    /// Lists the tables the connector exposes.
    ///
    /// A failure may still carry the tables that were listed before it; see
    /// [`FetchError::partial`].
    async fn fetch(&self, ctx: &RequestContext) -> Result<Vec<Table>, FetchError>;

    /// Executes `plan`, pushing every result row to `writer` before returning.
    ///
    /// Rows must match the projection of the plan in arity and order.
    async fn scan(
        &self,
        ctx: &RequestContext,
        plan: &Plan,
        writer: &dyn RowWriter,
    ) -> Result<(), HandlerError>;
}

/// Failure of [`Handler::fetch`], with whatever tables were listed before it.
///
/// Both parts are sent to Stargate together.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct FetchError {
    pub tables: Vec<Table>,
    pub source: HandlerError,
}

impl FetchError {
    pub fn new(source: impl Into<HandlerError>) -> Self {
        Self::partial(Vec::new(), source)
    }

    pub fn partial(tables: Vec<Table>, source: impl Into<HandlerError>) -> Self {
        Self {
            tables,
            source: source.into(),
        }
    }
}

impl From<HandlerError> for FetchError {
    fn from(source: HandlerError) -> Self {
        Self::new(source)
    }
}

/// Sink for rows produced by [`Handler::scan`].
#[async_trait]
pub trait RowWriter: Send + Sync {
    /// Encodes and sends one row. Rows are streamed, not buffered.
    async fn write(&self, values: Vec<Value>) -> Result<(), WriteError>;
}

/// Why a row could not be written.
///
/// Either failure ends the request; a scan should return promptly after
/// seeing one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// A value in the row has no wire encoding.
    #[error("failed to encode row: {0}")]
    Encode(#[from] CodecError),

    /// The stream is gone (session ended or a previous write failed).
    #[error("result stream closed")]
    Closed,
}
