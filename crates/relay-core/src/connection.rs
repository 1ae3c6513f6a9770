//! The core's view of one live transport connection.

use std::sync::Arc;

use bytes::Bytes;

use crate::errors::WriteError;
use crate::ids::ConnId;

/// A live connection owned by the reactor.
///
/// The core only keys on [`ConnectionHandle::id`] and enqueues frames through
/// [`ConnectionHandle::write`]; it never owns the socket.
pub trait ConnectionHandle: Send + Sync {
    /// Registry key, stable for the lifetime of the connection.
    fn id(&self) -> &ConnId;

    /// Peer address label, used for logging only.
    fn remote_addr(&self) -> &str;

    /// Enqueue a frame for asynchronous send.
    ///
    /// Must not block on socket I/O. An error means the frame was not queued.
    fn write(&self, frame: Bytes) -> Result<(), WriteError>;
}

/// Shared handle passed between the reactor, registry and dispatcher.
pub type SharedConnection = Arc<dyn ConnectionHandle>;
