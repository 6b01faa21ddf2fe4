//! Configuration validation functions.

use super::Config;

/// Reject configurations the server cannot run with.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.server.liveness_interval_secs == 0 {
        anyhow::bail!("server.liveness_interval_secs must be greater than zero");
    }
    if config.server.outbound_queue_capacity == 0 {
        anyhow::bail!("server.outbound_queue_capacity must be greater than zero");
    }
    if config.protocol.max_display_name_length == 0 {
        anyhow::bail!("protocol.max_display_name_length must be greater than zero");
    }
    if config.security.max_message_size == 0 {
        anyhow::bail!("security.max_message_size must be greater than zero");
    }

    if config.security.require_metrics_auth {
        let token_present = config
            .security
            .metrics_auth_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !token_present {
            anyhow::bail!(
                "security.require_metrics_auth is enabled but no metrics_auth_token is configured.\n\
                 Configure one with:\n\
                 export PAIRLINE__SECURITY__METRICS_AUTH_TOKEN=\"$(openssl rand -hex 32)\""
            );
        }
    }

    if config.verification.enabled {
        let verification = &config.verification;
        let secret_present = verification
            .secret
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if !secret_present {
            anyhow::bail!(
                "verification.secret must be provided when verification is enabled \
                 (export PAIRLINE__VERIFICATION__SECRET=...)"
            );
        }
        let endpoint = url::Url::parse(&verification.endpoint).map_err(|err| {
            anyhow::anyhow!(
                "verification.endpoint `{}` is not a valid URL: {err}",
                verification.endpoint
            )
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "verification.endpoint must use http or https (got `{}`)",
                endpoint.scheme()
            );
        }
        if verification.timeout_ms == 0 {
            anyhow::bail!("verification.timeout_ms must be greater than zero");
        }
    }

    config.websocket.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn zero_liveness_interval_is_rejected() {
        let mut config = Config::default();
        config.server.liveness_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn metrics_auth_requires_token() {
        let mut config = Config::default();
        config.security.require_metrics_auth = true;
        assert!(validate_config(&config).is_err());

        config.security.metrics_auth_token = Some("a-long-enough-token".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn verification_requires_secret_and_valid_endpoint() {
        let mut config = Config::default();
        config.verification.enabled = true;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("verification.secret"));

        config.verification.secret = Some("shh".to_string());
        assert!(validate_config(&config).is_ok());

        config.verification.endpoint = "not a url".to_string();
        assert!(validate_config(&config).is_err());

        config.verification.endpoint = "ftp://example.com/verify".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn join_timeout_bounds_are_enforced() {
        let mut config = Config::default();
        config.websocket.join_timeout_secs = 1;
        assert!(validate_config(&config).is_err());
    }
}
