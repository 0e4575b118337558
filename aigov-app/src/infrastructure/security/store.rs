use aigov_errors::GovernanceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Counters for one `operation:identifier` key. Lives for one window and is
/// owned by the store; the limiter never caches it between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub requests: u32,
    pub tokens: u64,
    pub window_start: i64,
    pub blocked_until: Option<i64>,
}

impl RateLimitRecord {
    pub fn fresh(now_ms: i64) -> Self {
        Self {
            requests: 0,
            tokens: 0,
            window_start: now_ms,
            blocked_until: None,
        }
    }
}

/// Replacement produced by an [`RateLimitStore::update`] callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub record: RateLimitRecord,
    pub ttl_ms: i64,
}

/// Callback for [`RateLimitStore::update`]. Sees the live record (if any) and
/// returns the replacement, or `None` to leave the key untouched. A backend
/// built on compare-and-swap may call it more than once.
pub type RecordUpdate<'a> = dyn FnMut(Option<RateLimitRecord>) -> Option<StoreWrite> + Send + 'a;

/// TTL-keyed counter storage behind the rate limiter.
///
/// Implementations must hide a record from `get` once its TTL has passed, even
/// if it is still physically retained. The limiter does all of its
/// read-modify-write through `update`, which must run atomically per key even
/// under a multi-threaded runtime; `get`/`set`/`increment` are the plain
/// accessors for administration and tests.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, GovernanceError>;

    async fn set(&self, key: &str, record: RateLimitRecord, ttl_ms: i64) -> Result<(), GovernanceError>;

    /// Reads and replaces the record for `key` with no other access to that
    /// key in between.
    async fn update(&self, key: &str, apply: &mut RecordUpdate<'_>) -> Result<(), GovernanceError>;

    /// Adds `amount` to the request counter and returns the new count. The
    /// limiter counts admissions inside `update` instead, since it must decide
    /// on block and token budget in the same step.
    async fn increment(&self, key: &str, amount: u32) -> Result<u32, GovernanceError>;

    /// Returns whether a live record was removed.
    async fn delete(&self, key: &str) -> Result<bool, GovernanceError>;
}
