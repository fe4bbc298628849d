//! Protocol domain for LunoDB connectors.
//!
//! This crate contains the row-value codec, the frames exchanged with
//! Stargate, the table descriptors connectors publish, and the port traits
//! the engine is built on. Infrastructure crates implement the transport
//! ports; host applications implement [`Handler`].
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`MessageId`, `SourceId`, `SecretToken`) |
//! | [`types`] | Type descriptors (`Kind`, `Type`) and their byte form |
//! | [`value`] | `Value` and the binary codec |
//! | [`schema`] | Table, column and operator descriptors |
//! | [`message`] | Inbound and outbound frames |
//! | [`handler`] | `Handler` and `RowWriter` ports |
//! | [`transport`] | `Transport`, `Channel` and stream ports |
//! | [`errors`] | `CodecError` |

pub mod errors;
pub mod handler;
pub mod identifiers;
pub mod message;
pub mod schema;
pub mod transport;
pub mod types;
pub mod value;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::CodecError;
pub use handler::{FetchError, Handler, HandlerError, RequestContext, RowWriter, WriteError};
pub use identifiers::{MessageId, ParseSourceIdError, SecretToken, SourceId};
pub use message::{
    ErrorInfo, ExecuteResult, InboundMessage, OutboundMessage, Plan, Request, Response, Row,
};
pub use schema::{Catalog, Column, ComparisonType, Operator, Statement, Table};
pub use transport::{
    AuthMetadata, Channel, Endpoint, FrameReceiver, FrameSender, SessionStream, Transport,
    TransportError, TransportSecurity,
};
pub use types::{Kind, Type};
pub use value::{Inet, Value};
