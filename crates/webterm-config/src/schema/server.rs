//! Listener configuration.

use serde::{Deserialize, Serialize};

/// Where the WebSocket endpoint listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface address to bind.
    pub bind: String,
    pub port: u16,
    /// Request path that accepts terminal upgrades; anything else gets 404.
    pub path: String,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8022,
            path: "/".into(),
        }
    }
}
