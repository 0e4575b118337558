use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(5);
const API_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AIErrorType {
    RateLimit,
    Validation,
    Network,
    Api,
    Unknown,
}

impl AIErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Validation => "validation",
            Self::Network => "network",
            Self::Api => "api",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AIErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified failure of an AI call. The only error shape that may reach a UI.
///
/// `original_error` keeps the rendered cause for logs; it is skipped when the
/// error is serialized for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AIError {
    #[serde(rename = "type")]
    pub kind: AIErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_requests: Option<u32>,
    #[serde(skip)]
    pub original_error: String,
}

impl AIError {
    pub fn new(kind: AIErrorType, message: impl Into<String>, original_error: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            reset_time: None,
            remaining_requests: None,
            original_error: original_error.into(),
        }
    }

    pub fn user_friendly_message(&self) -> &'static str {
        match self.kind {
            AIErrorType::RateLimit => {
                "You've reached the limit for AI requests. Please wait a moment and try again."
            }
            AIErrorType::Validation => {
                "Some of the information provided couldn't be processed. Please check it and try again."
            }
            AIErrorType::Network => {
                "We couldn't reach the AI service. Please check your connection and try again."
            }
            AIErrorType::Api => {
                "The AI service is temporarily unavailable. Please try again in a few moments."
            }
            AIErrorType::Unknown => {
                "Something went wrong while generating your response. Please try again later."
            }
        }
    }

    /// Only transient failures are retried. Rate limits are recovered by waiting,
    /// not by retrying.
    pub fn should_retry(&self) -> bool {
        matches!(self.kind, AIErrorType::Network | AIErrorType::Api)
    }

    pub fn retry_delay(&self) -> Duration {
        match self.kind {
            AIErrorType::RateLimit => Duration::from_secs(self.retry_after.unwrap_or(0)),
            AIErrorType::Network => NETWORK_RETRY_DELAY,
            AIErrorType::Api => API_RETRY_DELAY,
            AIErrorType::Validation | AIErrorType::Unknown => Duration::ZERO,
        }
    }
}

#[cfg(feature = "http")]
mod http_impl {
    use super::{AIError, AIErrorType};
    use axum::http::{header, HeaderValue, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use serde::Serialize;

    #[derive(Serialize)]
    struct ErrorResponse {
        #[serde(rename = "type")]
        kind: AIErrorType,
        message: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_after: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reset_time: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining_requests: Option<u32>,
    }

    impl IntoResponse for AIError {
        fn into_response(self) -> Response {
            let status = match self.kind {
                AIErrorType::RateLimit => StatusCode::TOO_MANY_REQUESTS,
                AIErrorType::Validation => StatusCode::BAD_REQUEST,
                AIErrorType::Network => StatusCode::SERVICE_UNAVAILABLE,
                AIErrorType::Api => StatusCode::BAD_GATEWAY,
                AIErrorType::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = ErrorResponse {
                kind: self.kind,
                message: self.user_friendly_message(),
                retry_after: self.retry_after,
                reset_time: self.reset_time,
                remaining_requests: self.remaining_requests,
            };

            let mut response = (status, Json(body)).into_response();
            if let Some(secs) = self.retry_after {
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            response
        }
    }
}
