//! Default value functions for configuration fields.
//!
//! These back the `#[serde(default = ...)]` attributes throughout the
//! configuration system, grouped by section.

use super::logging::LogFormat;

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    5000
}

// =============================================================================
// Server Defaults
// =============================================================================

/// Seconds between liveness sweeps.
pub const fn default_liveness_interval_secs() -> u64 {
    30
}

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_max_display_name_length() -> usize {
    crate::protocol::DEFAULT_MAX_DISPLAY_NAME_LENGTH
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_join_timeout_secs() -> u64 {
    60
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

/// Large enough for base64-encoded photos sent as chat images.
pub const fn default_max_message_size() -> usize {
    8 * 1024 * 1024
}

pub const fn default_max_connections_per_ip() -> usize {
    16
}

// =============================================================================
// Verification Defaults
// =============================================================================

pub fn default_verification_endpoint() -> String {
    "https://www.google.com/recaptcha/api/siteverify".to_string()
}

pub const fn default_verification_timeout_ms() -> u64 {
    5000
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "pairline.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
