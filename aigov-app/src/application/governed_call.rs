use super::prompt::estimate_tokens;
use crate::domain::{AiProvider, Completion};
use crate::infrastructure::security::{ErrorClassifier, RateLimiter};
use aigov_errors::{AIError, GovernanceError};

pub struct GovernedRequest<'a> {
    pub identifier: &'a str,
    pub operation: &'a str,
    /// Built only from sanitized fields.
    pub prompt: &'a str,
    pub max_output_tokens: u32,
}

impl GovernedRequest<'_> {
    /// Prompt estimate plus the full response budget.
    pub fn estimated_tokens(&self) -> u64 {
        estimate_tokens(self.prompt) + u64::from(self.max_output_tokens)
    }
}

/// Quota check, provider call, usage true-up and error classification, in
/// that order. Every failure leaves as an [`AIError`].
#[derive(Clone)]
pub struct GovernedCall {
    rate_limiter: RateLimiter,
    max_attempts: u32,
}

impl GovernedCall {
    pub fn new(rate_limiter: RateLimiter, max_attempts: u32) -> Self {
        Self {
            rate_limiter,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn execute(
        &self,
        provider: &dyn AiProvider,
        request: &GovernedRequest<'_>,
    ) -> Result<Completion, AIError> {
        let mut attempt = 1;
        loop {
            let error = match self.attempt(provider, request).await {
                Ok(completion) => return Ok(completion),
                Err(error) => error,
            };

            let classified = ErrorClassifier::classify(&error, request.operation, Some(request.identifier));
            if !classified.should_retry() || attempt >= self.max_attempts {
                return Err(classified);
            }

            let delay = classified.retry_delay();
            tracing::info!(
                operation = request.operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying AI call"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        provider: &dyn AiProvider,
        request: &GovernedRequest<'_>,
    ) -> Result<Completion, GovernanceError> {
        self.rate_limiter
            .enforce(request.identifier, request.operation, request.estimated_tokens())
            .await?;

        let completion = provider.complete(request.prompt, request.max_output_tokens).await?;

        // A failed true-up never discards a completed response.
        if let Err(e) = self
            .rate_limiter
            .record_token_usage(request.identifier, request.operation, completion.usage.total_tokens)
            .await
        {
            tracing::warn!(operation = request.operation, "Failed to record token usage: {}", e);
        }

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{limiter_with, ScriptedProvider};
    use crate::domain::TokenUsage;
    use crate::infrastructure::security::{RateLimitConfig, RateLimitStore};
    use aigov_errors::AIErrorType;
    use std::time::Duration;

    const OP: &str = "chat_message";

    fn request(prompt: &str) -> GovernedRequest<'_> {
        GovernedRequest {
            identifier: "user-1",
            operation: OP,
            prompt,
            max_output_tokens: 100,
        }
    }

    fn ok(text: &str, total_tokens: u64) -> Result<Completion, GovernanceError> {
        Ok(Completion {
            text: text.to_string(),
            usage: TokenUsage {
                prompt_tokens: total_tokens / 2,
                completion_tokens: total_tokens - total_tokens / 2,
                total_tokens,
            },
        })
    }

    #[tokio::test]
    async fn test_success_records_real_usage() {
        let (limiter, store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000).with_max_tokens(10_000));
        let provider = ScriptedProvider::new(vec![ok("hello", 500)]);
        let call = GovernedCall::new(limiter, 1);

        let completion = call.execute(&provider, &request("abcd")).await.unwrap();

        assert_eq!(completion.text, "hello");
        assert_eq!(provider.calls(), 1);
        // reserved 1 + 100, trued up to 500
        let record = store.get("chat_message:user-1").await.unwrap().unwrap();
        assert_eq!(record.tokens, 500);
        assert_eq!(record.requests, 1);
    }

    #[tokio::test]
    async fn test_denied_call_never_reaches_provider() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(1, 60_000));
        let provider = ScriptedProvider::new(vec![ok("first", 10), ok("second", 10)]);
        let call = GovernedCall::new(limiter, 3);

        call.execute(&provider, &request("hi")).await.unwrap();
        let err = call.execute(&provider, &request("hi")).await.unwrap_err();

        assert_eq!(err.kind, AIErrorType::RateLimit);
        assert_eq!(err.retry_after, Some(300));
        assert_eq!(err.remaining_requests, Some(0));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_budget_denies_before_provider() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000).with_max_tokens(50));
        let provider = ScriptedProvider::new(vec![ok("never", 10)]);
        let call = GovernedCall::new(limiter, 1);

        let err = call.execute(&provider, &request("hi")).await.unwrap_err();

        assert_eq!(err.kind, AIErrorType::RateLimit);
        assert_eq!(err.remaining_requests, Some(5));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_retried_after_delay() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000));
        let provider = ScriptedProvider::new(vec![
            Err(GovernanceError::Network("connection reset".to_string())),
            ok("recovered", 10),
        ]);
        let call = GovernedCall::new(limiter, 2);

        let started = tokio::time::Instant::now();
        let completion = call.execute(&provider, &request("hi")).await.unwrap();

        assert_eq!(completion.text, "recovered");
        assert_eq!(provider.calls(), 2);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000));
        let provider = ScriptedProvider::new(vec![
            Err(GovernanceError::Api("API error: 503".to_string())),
            Err(GovernanceError::Api("API error: 503".to_string())),
            ok("too late", 10),
        ]);
        let call = GovernedCall::new(limiter, 2);

        let err = call.execute(&provider, &request("hi")).await.unwrap_err();

        assert_eq!(err.kind, AIErrorType::Api);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_returns_immediately() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000));
        let provider = ScriptedProvider::new(vec![
            Err(GovernanceError::validation("prompt too long")),
            ok("unused", 10),
        ]);
        let call = GovernedCall::new(limiter, 3);

        let err = call.execute(&provider, &request("hi")).await.unwrap_err();

        assert_eq!(err.kind, AIErrorType::Validation);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_operation_surfaces_as_unknown() {
        let (limiter, _store, _clock) = limiter_with(OP, RateLimitConfig::new(5, 60_000));
        let provider = ScriptedProvider::new(vec![ok("unused", 10)]);
        let call = GovernedCall::new(limiter, 3);
        let req = GovernedRequest {
            operation: "not_configured",
            ..request("hi")
        };

        let err = call.execute(&provider, &req).await.unwrap_err();

        assert_eq!(err.kind, AIErrorType::Unknown);
        assert_eq!(provider.calls(), 0);
    }
}
