//! Human-verification configuration types.

use super::defaults::{default_verification_endpoint, default_verification_timeout_ms};
use serde::{Deserialize, Serialize};

/// Settings for the remote verdict consulted once per `join`.
///
/// When disabled every join is accepted without contacting the endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VerificationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// reCAPTCHA-compatible `siteverify` URL
    #[serde(default = "default_verification_endpoint")]
    pub endpoint: String,
    /// Server-side secret sent alongside the client token
    #[serde(default)]
    pub secret: Option<String>,
    /// Upper bound on a single verification request (milliseconds)
    #[serde(default = "default_verification_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_verification_endpoint(),
            secret: None,
            timeout_ms: default_verification_timeout_ms(),
        }
    }
}
