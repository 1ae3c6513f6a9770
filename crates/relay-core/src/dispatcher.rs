//! Broadcast and echo dispatch of inbound frames.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::connection::SharedConnection;
use crate::errors::{ParseModeError, WriteError};
use crate::events::{CloseReason, EventSink};
use crate::registry::ConnectionRegistry;

/// Longest text preview included in per-frame log lines.
const LOG_PREVIEW_BYTES: usize = 256;

/// Recipient policy for inbound frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Every registered connection, the sender included.
    #[default]
    Broadcast,
    /// The sender only.
    Echo,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => f.write_str("broadcast"),
            Self::Echo => f.write_str("echo"),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "broadcast" | "chat" => Ok(Self::Broadcast),
            "echo" => Ok(Self::Echo),
            _ => Err(ParseModeError(s.to_owned())),
        }
    }
}

/// Outcome of relaying one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

enum Policy {
    Broadcast(Arc<ConnectionRegistry>),
    Echo,
}

/// Event sink that relays every inbound frame according to a [`DispatchMode`].
pub struct Dispatcher {
    policy: Policy,
}

impl Dispatcher {
    /// Create a dispatcher for `mode`, with a fresh registry when broadcasting.
    pub fn new(mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Broadcast => Self::broadcast(Arc::new(ConnectionRegistry::new())),
            DispatchMode::Echo => Self::echo(),
        }
    }

    /// Broadcast to every member of `registry`.
    pub fn broadcast(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            policy: Policy::Broadcast(registry),
        }
    }

    /// Echo each frame to its sender. Keeps no registry.
    pub fn echo() -> Self {
        Self { policy: Policy::Echo }
    }

    pub fn mode(&self) -> DispatchMode {
        match self.policy {
            Policy::Broadcast(_) => DispatchMode::Broadcast,
            Policy::Echo => DispatchMode::Echo,
        }
    }

    /// The registry backing broadcast mode; `None` in echo mode.
    pub fn registry(&self) -> Option<&Arc<ConnectionRegistry>> {
        match &self.policy {
            Policy::Broadcast(registry) => Some(registry),
            Policy::Echo => None,
        }
    }

    /// Relay `frame` from `sender` and report what happened.
    ///
    /// Write failures are logged and counted; they never stop delivery to
    /// the remaining recipients.
    pub fn dispatch(&self, sender: &SharedConnection, frame: &Bytes) -> DispatchReport {
        let mut report = DispatchReport::default();
        match &self.policy {
            Policy::Broadcast(registry) => {
                registry.for_each(|conn| deliver(conn, frame, &mut report));
            }
            Policy::Echo => deliver(sender, frame, &mut report),
        }
        report
    }
}

fn deliver(conn: &SharedConnection, frame: &Bytes, report: &mut DispatchReport) {
    report.recipients += 1;
    match conn.write(frame.clone()) {
        Ok(()) => report.delivered += 1,
        Err(e) => {
            report.failed += 1;
            log_write_failure(conn, &e);
        }
    }
}

fn log_write_failure(conn: &SharedConnection, error: &WriteError) {
    let error_kind = error.error_kind();
    match error {
        // Peer mid-disconnect; its close event is on the way.
        WriteError::Closed => debug!(
            conn_id = %conn.id(),
            remote_addr = conn.remote_addr(),
            error_kind,
            "skipping write to closed connection"
        ),
        WriteError::QueueFull { capacity } => warn!(
            conn_id = %conn.id(),
            remote_addr = conn.remote_addr(),
            error_kind,
            capacity,
            "send queue full, dropping frame"
        ),
    }
}

fn preview(frame: &Bytes) -> String {
    let end = frame.len().min(LOG_PREVIEW_BYTES);
    String::from_utf8_lossy(&frame[..end]).trim_end().to_owned()
}

impl EventSink for Dispatcher {
    fn on_boot(&self, local_addr: SocketAddr) {
        info!(%local_addr, mode = %self.mode(), "relay server is listening");
    }

    fn on_open(&self, conn: &SharedConnection) {
        info!(conn_id = %conn.id(), remote_addr = conn.remote_addr(), "client connected");
        if let Some(registry) = self.registry() {
            let _ = registry.add(conn);
        }
    }

    fn on_close(&self, conn: &SharedConnection, reason: &CloseReason) {
        info!(
            conn_id = %conn.id(),
            remote_addr = conn.remote_addr(),
            %reason,
            "client disconnected"
        );
        if let Some(registry) = self.registry() {
            if registry.remove(conn.id()).is_some() {
                info!(conn_id = %conn.id(), remaining = registry.len(), "connection removed");
            }
        }
    }

    fn on_traffic(&self, conn: &SharedConnection, frame: Bytes) {
        let report = self.dispatch(conn, &frame);
        info!(
            conn_id = %conn.id(),
            bytes = frame.len(),
            recipients = report.recipients,
            failed = report.failed,
            message = %preview(&frame),
            "relayed frame"
        );
    }
}
