//! Concurrency-safe set of live connections.

use dashmap::DashMap;

use crate::connection::SharedConnection;
use crate::ids::ConnId;

/// Set of live connections keyed by [`ConnId`].
///
/// A handle is present iff an open was recorded for it and the matching
/// close has not been. Uses `DashMap` for shard-level locking, so callers
/// on any worker thread need no external synchronisation.
pub struct ConnectionRegistry {
    connections: DashMap<ConnId, SharedConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Insert a connection. Returns `false` if it was already present, in
    /// which case the existing entry is left untouched.
    pub fn add(&self, conn: &SharedConnection) -> bool {
        let mut inserted = false;
        let _ = self
            .connections
            .entry(conn.id().clone())
            .or_insert_with(|| {
                inserted = true;
                conn.clone()
            });
        inserted
    }

    /// Remove a connection by ID. Absent IDs are a no-op.
    pub fn remove(&self, id: &ConnId) -> Option<SharedConnection> {
        self.connections.remove(id).map(|(_, conn)| conn)
    }

    pub fn contains(&self, id: &ConnId) -> bool {
        self.connections.contains_key(id)
    }

    /// Point-in-time copy of the members. No shard lock is held once this
    /// returns.
    pub fn snapshot(&self) -> Vec<SharedConnection> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Visit every member of a snapshot exactly once.
    ///
    /// The visitor runs without any registry lock held, so it may write to
    /// the connection or even add/remove members. Connections added or
    /// removed during the walk may or may not be visited.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&SharedConnection),
    {
        for conn in self.snapshot() {
            visit(&conn);
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
