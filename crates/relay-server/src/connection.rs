//! TCP connection handle backed by a bounded send queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use relay_core::{ConnId, ConnectionHandle, WriteError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One accepted TCP socket, as seen by the core.
///
/// `write` enqueues onto the channel drained by the connection's writer
/// task, so it never waits on the socket.
pub struct TcpConnection {
    id: ConnId,
    remote_addr: String,
    tx: mpsc::Sender<Bytes>,
    /// Cancelled once the connection stops taking new frames. Frames queued
    /// before that are still flushed unless the connection is aborted.
    closing: CancellationToken,
    connected_at: Instant,
    dropped_frames: AtomicU64,
}

impl TcpConnection {
    pub fn new(
        id: ConnId,
        remote_addr: impl Into<String>,
        tx: mpsc::Sender<Bytes>,
        closing: CancellationToken,
    ) -> Self {
        Self {
            id,
            remote_addr: remote_addr.into(),
            tx,
            closing,
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Frames rejected because the send queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl ConnectionHandle for TcpConnection {
    fn id(&self) -> &ConnId {
        &self.id
    }

    fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    fn write(&self, frame: Bytes) -> Result<(), WriteError> {
        if self.closing.is_cancelled() {
            return Err(WriteError::Closed);
        }
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                Err(WriteError::QueueFull {
                    capacity: self.tx.max_capacity(),
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(WriteError::Closed),
        }
    }
}
