use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::connection::{ConnectionHandle, SharedConnection};
use crate::errors::WriteError;
use crate::ids::ConnId;

/// In-memory connection that records every frame written to it.
pub(crate) struct MockConnection {
    id: ConnId,
    remote_addr: String,
    dead: AtomicBool,
    written: Mutex<Vec<Bytes>>,
}

impl MockConnection {
    pub(crate) fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ConnId::from_raw(id),
            remote_addr: format!("127.0.0.1:{}", 40_000 + id.len()),
            dead: AtomicBool::new(false),
            written: Mutex::new(Vec::new()),
        })
    }

    /// A connection whose peer is already gone: every write fails.
    pub(crate) fn dead(id: &str) -> Arc<Self> {
        let conn = Self::new(id);
        conn.dead.store(true, Ordering::Relaxed);
        conn
    }

    pub(crate) fn written(&self) -> Vec<Bytes> {
        self.written.lock().clone()
    }
}

impl ConnectionHandle for MockConnection {
    fn id(&self) -> &ConnId {
        &self.id
    }

    fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    fn write(&self, frame: Bytes) -> Result<(), WriteError> {
        if self.dead.load(Ordering::Relaxed) {
            return Err(WriteError::Closed);
        }
        self.written.lock().push(frame);
        Ok(())
    }
}

pub(crate) fn shared(conn: &Arc<MockConnection>) -> SharedConnection {
    conn.clone()
}
