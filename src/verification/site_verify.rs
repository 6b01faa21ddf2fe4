//! Verifier for reCAPTCHA-compatible `siteverify` endpoints.

use super::{TokenVerifier, VerificationError};
use crate::config::VerificationConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// POSTs `secret` and `response` as a form to the configured endpoint and
/// reads back `{ "success": bool }`.
pub struct SiteVerifyVerifier {
    client: reqwest::Client,
    endpoint: String,
    secret: String,
}

impl SiteVerifyVerifier {
    pub fn new(
        endpoint: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            secret: secret.into(),
        })
    }

    pub fn from_config(config: &VerificationConfig) -> Result<Self, VerificationError> {
        let secret = config
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                VerificationError::Misconfigured("verification.secret is not set".to_string())
            })?;
        Self::new(
            config.endpoint.clone(),
            secret,
            Duration::from_millis(config.timeout_ms),
        )
    }
}

#[async_trait]
impl TokenVerifier for SiteVerifyVerifier {
    async fn verify(&self, token: Option<&str>) -> Result<bool, VerificationError> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            tracing::debug!("Join carried no verification token");
            return Ok(false);
        };

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("secret", self.secret.as_str()), ("response", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerificationError::UnexpectedStatus(status.as_u16()));
        }

        let verdict: SiteVerifyResponse = response.json().await?;
        if !verdict.success {
            tracing::debug!(error_codes = ?verdict.error_codes, "Verification endpoint rejected token");
        }
        Ok(verdict.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    async fn spawn_fake_endpoint() -> SocketAddr {
        async fn siteverify(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
            let ok = form.get("secret").map(String::as_str) == Some("server-secret")
                && form.get("response").map(String::as_str) == Some("good-token");
            if ok {
                Json(serde_json::json!({ "success": true }))
            } else {
                Json(serde_json::json!({ "success": false, "error-codes": ["invalid-input-response"] }))
            }
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/siteverify", post(siteverify));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    #[tokio::test]
    async fn accepts_and_rejects_tokens() {
        let addr = spawn_fake_endpoint().await;
        let verifier = SiteVerifyVerifier::new(
            format!("http://{addr}/siteverify"),
            "server-secret",
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(verifier.verify(Some("good-token")).await.unwrap());
        assert!(!verifier.verify(Some("bad-token")).await.unwrap());
        assert!(!verifier.verify(None).await.unwrap());
        assert!(!verifier.verify(Some("   ")).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Bind then drop to obtain a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verifier = SiteVerifyVerifier::new(
            format!("http://{addr}/siteverify"),
            "server-secret",
            Duration::from_millis(500),
        )
        .unwrap();

        assert!(verifier.verify(Some("good-token")).await.is_err());
    }
}
