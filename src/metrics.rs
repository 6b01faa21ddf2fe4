use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the chat server
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub connection_limit_rejections: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,

    // Session metrics
    pub joins: AtomicU64,
    pub join_rejections: AtomicU64,
    pub join_timeouts: AtomicU64,
    pub verification_failures: AtomicU64,
    pub matches: AtomicU64,
    pub waiting_replies: AtomicU64,
    pub skips: AtomicU64,

    // Relay metrics
    pub relayed_messages: AtomicU64,
    pub no_partner_replies: AtomicU64,

    // Liveness metrics
    pub liveness_sweeps: AtomicU64,
    pub liveness_probes_sent: AtomicU64,
    pub liveness_evictions: AtomicU64,

    // Error tracking
    pub malformed_envelopes: AtomicU64,
    pub unknown_envelopes: AtomicU64,
    pub oversized_frames: AtomicU64,
    pub internal_errors: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub sessions: SessionMetrics,
    pub relay: RelayMetrics,
    pub liveness: LivenessMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub connection_limit_rejections: u64,
    pub websocket_messages_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionMetrics {
    pub joins: u64,
    pub join_rejections: u64,
    pub join_timeouts: u64,
    pub verification_failures: u64,
    pub matches: u64,
    pub waiting_replies: u64,
    pub skips: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RelayMetrics {
    pub relayed_messages: u64,
    pub no_partner_replies: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LivenessMetrics {
    pub sweeps: u64,
    pub probes_sent: u64,
    pub evictions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorMetrics {
    pub malformed_envelopes: u64,
    pub unknown_envelopes: u64,
    pub oversized_frames: u64,
    pub internal_errors: u64,
    pub total_errors: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // Check-then-decrement in one step so racing disconnects never underflow.
        let _ =
            self.active_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    current.checked_sub(1)
                });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_connection_limit_rejections(&self) {
        self.connection_limit_rejections
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        self.websocket_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    // Session metrics
    pub fn increment_joins(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_rejections(&self) {
        self.join_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_timeouts(&self) {
        self.join_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_verification_failures(&self) {
        self.verification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches(&self) {
        self.matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_waiting_replies(&self) {
        self.waiting_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skips(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    // Relay metrics
    pub fn increment_relayed_messages(&self) {
        self.relayed_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_no_partner_replies(&self) {
        self.no_partner_replies.fetch_add(1, Ordering::Relaxed);
    }

    // Liveness metrics
    pub fn record_liveness_sweep(&self, probes_sent: usize, evictions: usize) {
        self.liveness_sweeps.fetch_add(1, Ordering::Relaxed);
        self.liveness_probes_sent
            .fetch_add(probes_sent as u64, Ordering::Relaxed);
        self.liveness_evictions
            .fetch_add(evictions as u64, Ordering::Relaxed);
    }

    // Error tracking
    pub fn increment_malformed_envelopes(&self) {
        self.malformed_envelopes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_envelopes(&self) {
        self.unknown_envelopes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_oversized_frames(&self) {
        self.oversized_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_internal_errors(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let malformed_envelopes = self.malformed_envelopes.load(Ordering::Relaxed);
        let unknown_envelopes = self.unknown_envelopes.load(Ordering::Relaxed);
        let oversized_frames = self.oversized_frames.load(Ordering::Relaxed);
        let internal_errors = self.internal_errors.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: self.total_connections.load(Ordering::Relaxed),
                active_connections: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                connection_limit_rejections: self
                    .connection_limit_rejections
                    .load(Ordering::Relaxed),
                websocket_messages_dropped: self.websocket_messages_dropped.load(Ordering::Relaxed),
            },
            sessions: SessionMetrics {
                joins: self.joins.load(Ordering::Relaxed),
                join_rejections: self.join_rejections.load(Ordering::Relaxed),
                join_timeouts: self.join_timeouts.load(Ordering::Relaxed),
                verification_failures: self.verification_failures.load(Ordering::Relaxed),
                matches: self.matches.load(Ordering::Relaxed),
                waiting_replies: self.waiting_replies.load(Ordering::Relaxed),
                skips: self.skips.load(Ordering::Relaxed),
            },
            relay: RelayMetrics {
                relayed_messages: self.relayed_messages.load(Ordering::Relaxed),
                no_partner_replies: self.no_partner_replies.load(Ordering::Relaxed),
            },
            liveness: LivenessMetrics {
                sweeps: self.liveness_sweeps.load(Ordering::Relaxed),
                probes_sent: self.liveness_probes_sent.load(Ordering::Relaxed),
                evictions: self.liveness_evictions.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                malformed_envelopes,
                unknown_envelopes,
                oversized_frames,
                internal_errors,
                total_errors: malformed_envelopes
                    + unknown_envelopes
                    + oversized_frames
                    + internal_errors,
            },
        }
    }
}
