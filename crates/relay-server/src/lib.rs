//! # relay-server
//!
//! Tokio reactor for the relay: accepts TCP connections, runs one read and
//! one write task per connection, and reports lifecycle events to an
//! [`relay_core::EventSink`].
//!
//! - Per-connection bounded send queue behind [`TcpConnection`]
//! - Single-core or multicore runtime via [`build_runtime`]
//! - Graceful shutdown via `CancellationToken` + `TaskTracker`

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod runtime;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use connection::TcpConnection;
pub use errors::ServerError;
pub use runtime::build_runtime;
pub use server::RelayServer;
pub use shutdown::ShutdownCoordinator;
