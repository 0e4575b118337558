use super::clock::Clock;
use super::rate_limit_config::{RateLimitConfig, RateLimitTable};
use super::store::{RateLimitRecord, RateLimitStore, StoreWrite};
use aigov_errors::{GovernanceError, RateLimitError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining_requests: u32,
    /// Epoch milliseconds when the window (or active block) ends.
    pub reset_time: i64,
    /// Seconds to wait, set only on denial.
    pub retry_after: Option<u64>,
    pub total_requests: u32,
}

impl RateLimitResult {
    fn unlimited(now: i64) -> Self {
        Self {
            allowed: true,
            remaining_requests: u32::MAX,
            reset_time: now,
            retry_after: None,
            total_requests: 0,
        }
    }
}

/// Windowed request quota with a token budget and a punitive cooldown.
///
/// Records are re-read from the store on every call. Every read-modify-write
/// runs inside [`RateLimitStore::update`], so concurrent checks on one key
/// never lose updates.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    table: Arc<RateLimitTable>,
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        table: Arc<RateLimitTable>,
        clock: Arc<dyn Clock>,
        enabled: bool,
    ) -> Self {
        if !enabled {
            tracing::warn!("AI rate limiting is disabled, every request will be admitted");
        }
        Self {
            store,
            table,
            clock,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn check_limit(
        &self,
        identifier: &str,
        operation: &str,
        estimated_tokens: u64,
    ) -> Result<RateLimitResult, GovernanceError> {
        let now = self.clock.now_ms();
        if !self.enabled {
            return Ok(RateLimitResult::unlimited(now));
        }

        let config = self.config(operation)?;
        let key = storage_key(operation, identifier);

        let mut outcome = None;
        self.store
            .update(&key, &mut |stored| {
                let (write, admission) = admit(stored, config, now, estimated_tokens);
                outcome = Some(admission);
                write
            })
            .await?;
        let admission = outcome
            .ok_or_else(|| GovernanceError::Store(format!("Store skipped the update for {}", key)))?;

        let result = match admission {
            Admission::Admitted(record) => {
                tracing::debug!(
                    key = %key,
                    requests = record.requests,
                    tokens = record.tokens,
                    "AI request admitted"
                );
                RateLimitResult {
                    allowed: true,
                    remaining_requests: config.max_requests.saturating_sub(record.requests),
                    reset_time: record.window_start + config.window_ms,
                    retry_after: None,
                    total_requests: record.requests,
                }
            }
            Admission::Blocked(record) => denial(&record, config, now),
            Admission::Exceeded { record, reason } => {
                tracing::warn!(
                    key = %key,
                    reason,
                    blocked_until = record.blocked_until,
                    requests = record.requests,
                    tokens = record.tokens,
                    "AI rate limit exceeded, blocking"
                );
                denial(&record, config, now)
            }
        };
        Ok(result)
    }

    /// `check_limit`, with a denial turned into `GovernanceError::RateLimit`.
    pub async fn enforce(
        &self,
        identifier: &str,
        operation: &str,
        estimated_tokens: u64,
    ) -> Result<RateLimitResult, GovernanceError> {
        let result = self.check_limit(identifier, operation, estimated_tokens).await?;
        if result.allowed {
            return Ok(result);
        }
        Err(RateLimitError::new(
            operation,
            identifier,
            result.retry_after.unwrap_or(1),
            result.reset_time,
            result.remaining_requests,
        )
        .into())
    }

    /// Trues up the token counter with the real usage. Never lowers it.
    pub async fn record_token_usage(
        &self,
        identifier: &str,
        operation: &str,
        actual_tokens: u64,
    ) -> Result<(), GovernanceError> {
        if !self.enabled {
            return Ok(());
        }

        let now = self.clock.now_ms();
        let config = self.config(operation)?;
        let key = storage_key(operation, identifier);

        let mut had_window = false;
        self.store
            .update(&key, &mut |stored| {
                let mut record = stored.filter(|r| within_window(r, config, now))?;
                had_window = true;
                if actual_tokens <= record.tokens {
                    return None;
                }
                record.tokens = actual_tokens;

                let expires_at = match record.blocked_until {
                    Some(until) if until > now => until,
                    _ => record.window_start + config.window_ms,
                };
                Some(StoreWrite {
                    record,
                    ttl_ms: (expires_at - now).max(1),
                })
            })
            .await?;

        if !had_window {
            tracing::debug!(key = %key, "No active window, token usage not recorded");
        }
        Ok(())
    }

    /// Read-only view of the current window. Never blocks or mutates.
    pub async fn get_status(
        &self,
        identifier: &str,
        operation: &str,
    ) -> Result<RateLimitResult, GovernanceError> {
        let now = self.clock.now_ms();
        if !self.enabled {
            return Ok(RateLimitResult::unlimited(now));
        }

        let config = self.config(operation)?;
        let key = storage_key(operation, identifier);
        let record = self
            .live_record(&key, config, now)
            .await?
            .unwrap_or_else(|| RateLimitRecord::fresh(now));

        if record.blocked_until.is_some_and(|until| now < until) {
            return Ok(denial(&record, config, now));
        }
        let remaining_requests = config.max_requests.saturating_sub(record.requests);
        Ok(RateLimitResult {
            allowed: remaining_requests > 0,
            remaining_requests,
            reset_time: record.window_start + config.window_ms,
            retry_after: None,
            total_requests: record.requests,
        })
    }

    /// Administrative override: drops the key whatever its state.
    pub async fn reset_limit(&self, identifier: &str, operation: &str) -> Result<bool, GovernanceError> {
        if !self.enabled {
            return Ok(false);
        }
        let key = storage_key(operation, identifier);
        let removed = self.store.delete(&key).await?;
        tracing::info!(key = %key, removed, "Rate limit reset");
        Ok(removed)
    }

    fn config(&self, operation: &str) -> Result<&RateLimitConfig, GovernanceError> {
        self.table.get(operation).ok_or_else(|| {
            GovernanceError::configuration(format!("No rate limit configured for operation '{}'", operation))
        })
    }

    async fn live_record(
        &self,
        key: &str,
        config: &RateLimitConfig,
        now: i64,
    ) -> Result<Option<RateLimitRecord>, GovernanceError> {
        let record = self.store.get(key).await?;
        Ok(record.filter(|r| within_window(r, config, now)))
    }
}

enum Admission {
    Admitted(RateLimitRecord),
    /// An earlier block is still running.
    Blocked(RateLimitRecord),
    Exceeded {
        record: RateLimitRecord,
        reason: &'static str,
    },
}

/// The check/block/admit decision for one request. Runs inside the store's
/// per-key update.
fn admit(
    stored: Option<RateLimitRecord>,
    config: &RateLimitConfig,
    now: i64,
    estimated_tokens: u64,
) -> (Option<StoreWrite>, Admission) {
    let mut record = stored
        .filter(|r| within_window(r, config, now))
        .unwrap_or_else(|| RateLimitRecord::fresh(now));

    if record.blocked_until.is_some_and(|until| now < until) {
        return (None, Admission::Blocked(record));
    }

    let reason = if record.requests >= config.max_requests {
        Some("request quota")
    } else if config
        .max_tokens
        .is_some_and(|max| record.tokens.saturating_add(estimated_tokens) > max)
    {
        Some("token budget")
    } else {
        None
    };

    if let Some(reason) = reason {
        let block_ms = config.block_duration();
        record.blocked_until = Some(now + block_ms);
        let write = StoreWrite {
            record: record.clone(),
            ttl_ms: block_ms,
        };
        return (Some(write), Admission::Exceeded { record, reason });
    }

    record.requests += 1;
    record.tokens = record.tokens.saturating_add(estimated_tokens);
    let write = StoreWrite {
        record: record.clone(),
        ttl_ms: config.window_ms,
    };
    (Some(write), Admission::Admitted(record))
}

fn denial(record: &RateLimitRecord, config: &RateLimitConfig, now: i64) -> RateLimitResult {
    let blocked_until = record.blocked_until.unwrap_or(now);
    RateLimitResult {
        allowed: false,
        remaining_requests: config.max_requests.saturating_sub(record.requests),
        reset_time: blocked_until,
        retry_after: Some(seconds_until(blocked_until, now)),
        total_requests: record.requests,
    }
}

fn within_window(record: &RateLimitRecord, config: &RateLimitConfig, now: i64) -> bool {
    now - record.window_start <= config.window_ms
}

fn storage_key(operation: &str, identifier: &str) -> String {
    format!("{}:{}", operation, identifier)
}

fn seconds_until(target_ms: i64, now_ms: i64) -> u64 {
    let remaining = (target_ms - now_ms).max(0) as u64;
    remaining.div_ceil(1000)
}
