use crate::RateLimitError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum GovernanceError {
    /// Unknown operation or broken configuration. A programmer mistake, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Prompt injection detected in {field} ({pattern})")]
    InjectionDetected { field: String, pattern: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("AI API error: {0}")]
    Api(String),

    #[error("Rate limit store error: {0}")]
    Store(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GovernanceError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
