//! Server behavior configuration types.

use super::defaults::{default_liveness_interval_secs, default_outbound_queue_capacity};
use serde::{Deserialize, Serialize};

/// Server configuration for matchmaking and liveness.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval between liveness probes (seconds).
    /// A silent connection is evicted within two intervals.
    #[serde(default = "default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,
    /// Capacity of each connection's outbound message queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            liveness_interval_secs: default_liveness_interval_secs(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
        }
    }
}
