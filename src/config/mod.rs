//! Configuration module for Pairline.
//!
//! Supports JSON configuration files, inline JSON and stdin input,
//! `PAIRLINE__` environment overrides, and compiled-in defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Liveness and queueing settings
//! - [`protocol`]: Envelope field limits
//! - [`websocket`]: Per-connection transport settings
//! - [`security`]: CORS, frame size, per-IP limits, metrics auth
//! - [`verification`]: Remote human-verification settings
//! - [`logging`]: Logging configuration
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod verification;
pub mod websocket;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use protocol::ProtocolConfig;

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::validate_config;

pub use verification::VerificationConfig;

pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 5000);
        assert_eq!(config.server.liveness_interval_secs, 30);
        assert_eq!(config.server.outbound_queue_capacity, 64);
        assert_eq!(config.protocol.max_display_name_length, 32);
        assert_eq!(config.websocket.join_timeout_secs, 60);
        assert_eq!(config.security.cors_origins, "*");
        assert_eq!(config.security.max_connections_per_ip, 16);
        assert!(!config.security.require_metrics_auth);
        assert!(!config.verification.enabled);
        assert_eq!(config.verification.timeout_ms, 5000);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "pairline.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.server.liveness_interval_secs,
            deserialized.server.liveness_interval_secs
        );
        assert_eq!(
            config.verification.endpoint,
            deserialized.verification.endpoint
        );
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"server": {"liveness_interval_secs": 5}}"#)
            .unwrap();
        assert_eq!(config.server.liveness_interval_secs, 5);
        assert_eq!(config.server.outbound_queue_capacity, 64);
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" err "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("verbose"), None);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_lenient_logging_level() {
        let logging: LoggingConfig = serde_json::from_str(r#"{"level": "Debug"}"#).unwrap();
        assert_eq!(logging.level, Some(LogLevel::Debug));

        let logging: LoggingConfig = serde_json::from_str(r#"{"level": ["info", "x"]}"#).unwrap();
        assert_eq!(logging.level, Some(LogLevel::Info));

        let logging: LoggingConfig = serde_json::from_str(r#"{"level": "loud"}"#).unwrap();
        assert_eq!(logging.level, None);
    }
}
