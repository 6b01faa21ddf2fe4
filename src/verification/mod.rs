//! Human-verification collaborator consulted once per `join`.
//!
//! The session controller only needs a yes/no verdict. How that verdict is
//! produced (reCAPTCHA, Turnstile, a test double) lives behind
//! [`TokenVerifier`].

pub mod error;
pub mod site_verify;

pub use error::VerificationError;
pub use site_verify::SiteVerifyVerifier;

use crate::config::VerificationConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Produces a verdict for the token a client presents when joining.
///
/// Implementations may be slow or fail; the caller never holds the
/// registry lock while awaiting them.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `Ok(true)` admits the client, `Ok(false)` is a negative verdict.
    async fn verify(&self, token: Option<&str>) -> Result<bool, VerificationError>;
}

/// Verifier used when verification is disabled: every join is admitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllVerifier;

#[async_trait]
impl TokenVerifier for AcceptAllVerifier {
    async fn verify(&self, _token: Option<&str>) -> Result<bool, VerificationError> {
        Ok(true)
    }
}

/// Build the verifier selected by configuration.
pub fn build_verifier(config: &VerificationConfig) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    if !config.enabled {
        tracing::info!("Human verification disabled; all joins are admitted");
        return Ok(Arc::new(AcceptAllVerifier));
    }

    let verifier = SiteVerifyVerifier::from_config(config)?;
    tracing::info!(endpoint = %config.endpoint, "Human verification enabled");
    Ok(Arc::new(verifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_all_admits_missing_tokens() {
        let verifier = AcceptAllVerifier;
        assert!(verifier.verify(None).await.unwrap());
        assert!(verifier.verify(Some("anything")).await.unwrap());
    }

    #[test]
    fn disabled_config_builds_accept_all() {
        assert!(build_verifier(&VerificationConfig::default()).is_ok());
    }

    #[test]
    fn enabled_config_without_secret_fails_to_build() {
        let config = VerificationConfig {
            enabled: true,
            ..VerificationConfig::default()
        };
        assert!(build_verifier(&config).is_err());
    }
}
