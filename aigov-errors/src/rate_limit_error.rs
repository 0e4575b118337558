use serde::{Deserialize, Serialize};

/// Denial produced by the rate limiter. Always recoverable by waiting
/// `retry_after` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Rate limit exceeded for {operation}. Retry after {retry_after} seconds")]
pub struct RateLimitError {
    pub operation: String,
    pub identifier: String,
    pub retry_after: u64,
    /// Epoch milliseconds at which the current window or block ends.
    pub reset_time: i64,
    pub remaining_requests: u32,
}

impl RateLimitError {
    pub fn new(
        operation: impl Into<String>,
        identifier: impl Into<String>,
        retry_after: u64,
        reset_time: i64,
        remaining_requests: u32,
    ) -> Self {
        Self {
            operation: operation.into(),
            identifier: identifier.into(),
            retry_after,
            reset_time,
            remaining_requests,
        }
    }
}
