use thiserror::Error;

/// Failures reaching a verdict. Every variant is treated as a rejected join.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("verification endpoint returned HTTP {0}")]
    UnexpectedStatus(u16),
    #[error("verification is misconfigured: {0}")]
    Misconfigured(String),
}
