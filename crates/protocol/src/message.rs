//! Frames exchanged with Stargate over one session.
//!
//! Stargate sends [`InboundMessage`]s; the connector answers with one or more
//! [`OutboundMessage`]s carrying the same [`MessageId`]. Ping and Fetch are
//! answered with exactly one frame. ExecuteStatement is answered with zero or
//! more data rows followed by exactly one terminal frame (error or
//! end-of-execution).

use serde::{Deserialize, Serialize};

use crate::identifiers::MessageId;
use crate::schema::Table;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Opaque query plan, handed to [`crate::Handler::scan`] as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan(Vec<u8>);

impl Plan {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A request received from Stargate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Correlation token to echo on every response.
    pub id: MessageId,
    pub request: Request,
}

/// Request kinds. Kinds added by newer servers decode as [`Request::Unknown`]
/// and are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Fetch,
    ExecuteStatement { plan: Plan },
    #[serde(other)]
    Unknown,
}

impl Request {
    /// Short name used in log fields.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::Fetch => "fetch",
            Request::ExecuteStatement { .. } => "execute_statement",
            Request::Unknown => "unknown",
        }
    }
}

impl InboundMessage {
    pub fn ping(id: MessageId) -> Self {
        Self {
            id,
            request: Request::Ping,
        }
    }

    pub fn fetch(id: MessageId) -> Self {
        Self {
            id,
            request: Request::Fetch,
        }
    }

    pub fn execute(id: MessageId, plan: Plan) -> Self {
        Self {
            id,
            request: Request::ExecuteStatement { plan },
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Application error carried in-band in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Captures the `Display` text of an error.
    pub fn from_error(err: &(dyn std::error::Error + '_)) -> Self {
        Self::new(err.to_string())
    }
}

/// One encoded result row; one byte sequence per projected column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Vec<u8>>,
}

/// Outcome frames of an ExecuteStatement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteResult {
    Data(Row),
    Error(ErrorInfo),
    /// No more rows; the statement succeeded.
    EndOfExecution,
}

/// Response payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
    },
    Fetch {
        #[serde(default)]
        tables: Vec<Table>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
    },
    ExecuteStatement {
        result: ExecuteResult,
    },
}

impl Response {
    pub fn ping(error: Option<ErrorInfo>) -> Self {
        Response::Ping { error }
    }

    pub fn fetch(tables: Vec<Table>, error: Option<ErrorInfo>) -> Self {
        Response::Fetch { tables, error }
    }

    pub fn row(values: Vec<Vec<u8>>) -> Self {
        Response::ExecuteStatement {
            result: ExecuteResult::Data(Row { values }),
        }
    }

    pub fn execute_error(error: ErrorInfo) -> Self {
        Response::ExecuteStatement {
            result: ExecuteResult::Error(error),
        }
    }

    pub fn end_of_execution() -> Self {
        Response::ExecuteStatement {
            result: ExecuteResult::EndOfExecution,
        }
    }

    /// Returns `true` if no further frames follow for the same request.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Response::ExecuteStatement {
                result: ExecuteResult::Data(_)
            }
        )
    }
}

/// A response sent to Stargate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Id of the request this answers.
    pub id: MessageId,
    pub response: Response,
}
