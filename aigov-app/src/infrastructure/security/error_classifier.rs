use aigov_errors::{AIError, AIErrorType, GovernanceError, RateLimitError};
use std::error::Error;

const NETWORK_HINTS: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection",
    "econnrefused",
    "econnreset",
    "enotfound",
    "dns",
    "socket",
    "fetch failed",
];

const VALIDATION_HINTS: &[&str] = &["invalid", "validation", "malformed", "must be", "required", "too long"];

const API_HINTS: &[&str] = &[
    "api",
    "status",
    "model",
    "overloaded",
    "unavailable",
    "internal server error",
    "bad gateway",
    "quota",
];

/// Single funnel from arbitrary failures to [`AIError`].
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(
        error: &(dyn Error + 'static),
        operation: &str,
        identifier: Option<&str>,
    ) -> AIError {
        let original = error.to_string();
        let classified = Self::classify_tagged(error).unwrap_or_else(|| Self::classify_by_message(&original));

        let identifier = identifier.unwrap_or("-");
        match classified.kind {
            AIErrorType::Unknown => tracing::error!(
                operation,
                identifier,
                error_type = %classified.kind,
                cause = %original,
                "AI call failed"
            ),
            kind => tracing::warn!(
                operation,
                identifier,
                error_type = %kind,
                cause = %original,
                "AI call failed"
            ),
        }

        classified
    }

    /// Identity checks over the error and its source chain.
    fn classify_tagged(error: &(dyn Error + 'static)) -> Option<AIError> {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(ai) = err.downcast_ref::<AIError>() {
                return Some(ai.clone());
            }
            if let Some(limit) = err.downcast_ref::<RateLimitError>() {
                return Some(from_rate_limit(limit));
            }
            if let Some(governance) = err.downcast_ref::<GovernanceError>() {
                return Some(from_governance(governance));
            }
            #[cfg(feature = "openrouter")]
            if let Some(http) = err.downcast_ref::<reqwest::Error>() {
                let kind = if http.is_status() || http.is_decode() {
                    AIErrorType::Api
                } else {
                    AIErrorType::Network
                };
                return Some(AIError::new(kind, http.to_string(), http.to_string()));
            }
            current = err.source();
        }
        None
    }

    fn classify_by_message(message: &str) -> AIError {
        let lower = message.to_lowercase();
        let contains_any = |hints: &[&str]| hints.iter().any(|h| lower.contains(h));

        let kind = if contains_any(NETWORK_HINTS) {
            AIErrorType::Network
        } else if contains_any(VALIDATION_HINTS) {
            AIErrorType::Validation
        } else if contains_any(API_HINTS) {
            AIErrorType::Api
        } else {
            AIErrorType::Unknown
        };
        AIError::new(kind, message, message)
    }
}

fn from_rate_limit(limit: &RateLimitError) -> AIError {
    AIError {
        kind: AIErrorType::RateLimit,
        message: limit.to_string(),
        retry_after: Some(limit.retry_after),
        reset_time: Some(limit.reset_time),
        remaining_requests: Some(limit.remaining_requests),
        original_error: limit.to_string(),
    }
}

fn from_governance(error: &GovernanceError) -> AIError {
    let kind = match error {
        GovernanceError::RateLimit(limit) => return from_rate_limit(limit),
        GovernanceError::Validation(_) | GovernanceError::InjectionDetected { .. } => {
            AIErrorType::Validation
        }
        GovernanceError::Network(_) => AIErrorType::Network,
        GovernanceError::Api(_) => AIErrorType::Api,
        GovernanceError::Configuration(_) | GovernanceError::Store(_) | GovernanceError::Unknown(_) => {
            AIErrorType::Unknown
        }
    };
    AIError::new(kind, error.to_string(), error.to_string())
}
