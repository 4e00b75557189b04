//! Interactive confirmation surface.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    #[error("confirmation cancelled")]
    Cancelled,

    #[error("confirmation failed: {0}")]
    Failed(String),
}

/// Asks the user a yes/no question. Implementations own all rendering.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str, default: bool) -> Result<bool, ConfirmError>;
}

/// Non-interactive confirmer that accepts the suggested default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAnswer;

#[async_trait]
impl Confirmer for DefaultAnswer {
    async fn confirm(&self, _prompt: &str, default: bool) -> Result<bool, ConfirmError> {
        Ok(default)
    }
}

/// Confirmer for headless runs: every prompt is cancelled, so every prompt
/// denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

#[async_trait]
impl Confirmer for Unattended {
    async fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool, ConfirmError> {
        Err(ConfirmError::Cancelled)
    }
}
