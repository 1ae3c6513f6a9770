//! Server configuration.

use relay_core::DispatchMode;
use serde::{Deserialize, Serialize};

/// Configuration for the relay server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`, all interfaces).
    pub host: String,
    /// Port to bind (default `9000`, `0` for auto-assign).
    pub port: u16,
    /// Run the reactor on a multi-thread runtime.
    pub multicore: bool,
    /// Recipient policy for inbound frames.
    pub mode: DispatchMode,
    /// Frames buffered per connection before writes start failing.
    pub send_queue_capacity: usize,
    /// Bytes reserved for each socket read.
    pub read_buffer_size: usize,
    /// Grace period for connection tasks on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9000,
            multicore: false,
            mode: DispatchMode::Broadcast,
            send_queue_capacity: 1024,
            read_buffer_size: 4096,
            shutdown_timeout_secs: 5,
        }
    }
}

impl ServerConfig {
    /// `host:port` string handed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
