use serde::{Deserialize, Serialize};

/// Relay engine policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// End the session when a text frame is not valid JSON. When false
    /// such frames are logged and dropped like any unrecognized command.
    pub strict_control: bool,
    /// How long queued output may still be flushed at teardown (ms).
    pub flush_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            strict_control: false,
            flush_timeout_ms: 500,
        }
    }
}
