//! LunoDB connector transports.
//!
//! Implements the [`protocol::Transport`] port with two backends:
//!
//! - [`memory`] — an in-process channel pair. The server half stands in for
//!   Stargate in tests and lets embedders drive a connector directly.
//! - [`tcp`] — newline-delimited JSON frames over a plaintext TCP stream,
//!   preceded by one authentication line.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Framing, sockets and serialisation live here. The
//! `connector` crate sees only the port traits.

pub mod memory;
pub mod tcp;

pub use memory::{pair, MemoryServer, MemorySession, MemoryTransport};
pub use tcp::TcpTransport;
