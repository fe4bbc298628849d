//! LunoDB connector engine.
//!
//! A [`Connector`] dials Stargate through a [`protocol::Transport`], keeps
//! one authenticated session open, and answers the requests Stargate sends on
//! it by calling the host application's [`protocol::Handler`]. Sessions that
//! end for any reason are reopened after at most one heartbeat until the
//! shutdown token is cancelled.
//!
//! ## Architectural Layer
//!
//! **Application service.** Depends on the `protocol` ports only; the
//! transport is injected by the composition root.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | `config` | `ConnectorConfig` and its builder |
//! | `connector` | Supervisor: dial, open, serve, heartbeat wait |
//! | `dispatch` | Receive loop and shared outbound half of one session |
//! | `requests` | Ping, fetch and execute adapters |
//! | `task_group` | Per-session tasks with a shared cancellation scope |
//! | `health` | Liveness flag |
//! | `errors` | `ConfigError`, `ConnectorError`, `DispatchError` |
//!
//! ## Logging
//!
//! Events are emitted with `tracing` to the dispatcher set through
//! [`ConnectorConfigBuilder::logger`]; nothing is logged unless one is set.

mod config;
mod connector;
mod dispatch;
mod errors;
mod health;
mod requests;
mod task_group;

pub use config::{
    ConnectorConfig, ConnectorConfigBuilder, ADDRESS_ENV, DEFAULT_HEARTBEAT,
    DEFAULT_STARGATE_ADDRESS, INSECURE_ENV,
};
pub use connector::Connector;
pub use errors::{ConfigError, ConnectorError, DispatchError};
pub use tokio_util::sync::CancellationToken;
