//! Lifecycle callbacks delivered by the reactor.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

use crate::connection::SharedConnection;

/// Why a connection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side of the stream.
    PeerClosed,
    /// A read on the socket failed.
    ReadFailed(io::ErrorKind),
    /// Closed from this side: writer failure or server shutdown.
    Local,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed"),
            Self::ReadFailed(kind) => write!(f, "read failed: {kind}"),
            Self::Local => f.write_str("closed locally"),
        }
    }
}

/// Receiver of reactor events.
///
/// Callbacks may run concurrently on any worker thread. For a single
/// connection, `on_open` happens-before its `on_traffic` calls, which
/// happen-before its `on_close`. No callback may block on I/O.
pub trait EventSink: Send + Sync {
    /// The listener is bound and about to accept.
    fn on_boot(&self, _local_addr: SocketAddr) {}

    fn on_open(&self, conn: &SharedConnection);

    fn on_close(&self, conn: &SharedConnection, reason: &CloseReason);

    /// Bytes read since the previous delivery. No framing is implied.
    fn on_traffic(&self, conn: &SharedConnection, frame: Bytes);
}
