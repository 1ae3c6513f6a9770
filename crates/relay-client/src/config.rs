//! Client configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the relay client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address (default `"localhost"`).
    pub host: String,
    /// Server port (default `9000`).
    pub port: u16,
    /// Input line that ends the session. Never sent to the server.
    pub exit_sentinel: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 9000,
            exit_sentinel: "exit".into(),
        }
    }
}

impl ClientConfig {
    /// `host:port` string to resolve.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
