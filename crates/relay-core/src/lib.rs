//! # relay-core
//!
//! Connection registry and broadcast dispatch for the TCP relay.
//!
//! The core never performs socket I/O. A reactor hands it lifecycle events
//! through [`EventSink`] and the core answers with non-blocking writes on
//! [`ConnectionHandle`]s.

#![deny(unsafe_code)]

pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod ids;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use connection::{ConnectionHandle, SharedConnection};
pub use dispatcher::{DispatchMode, DispatchReport, Dispatcher};
pub use errors::{ParseModeError, WriteError};
pub use events::{CloseReason, EventSink};
pub use ids::ConnId;
pub use registry::ConnectionRegistry;
