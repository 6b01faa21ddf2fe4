//! WebSocket configuration types.

use super::defaults::default_join_timeout_secs;
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Time allowed between socket upgrade and a successful `join` (seconds)
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: default_join_timeout_secs(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.join_timeout_secs < 5 {
            anyhow::bail!(
                "websocket.join_timeout_secs must be at least 5 seconds (configured: {})",
                self.join_timeout_secs
            );
        }
        if self.join_timeout_secs > 600 {
            anyhow::bail!(
                "websocket.join_timeout_secs must not exceed 600 seconds (configured: {})",
                self.join_timeout_secs
            );
        }
        Ok(())
    }
}
