mod clock;
mod error_classifier;
mod injection_patterns;
mod memory_store;
mod prompt_sanitizer;
mod rate_limit_config;
mod rate_limiter;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error_classifier::ErrorClassifier;
pub use injection_patterns::{InjectionPattern, INJECTION_PATTERNS};
pub use memory_store::MemoryStore;
pub use prompt_sanitizer::{limits, PromptSanitizer, FILTERED_PLACEHOLDER};
pub use rate_limit_config::{
    operations, RateLimitConfig, RateLimitProfile, RateLimitTable, DEFAULT_BLOCK_DURATION_MS,
};
pub use rate_limiter::{RateLimitResult, RateLimiter};
pub use store::{RateLimitRecord, RateLimitStore, RecordUpdate, StoreWrite};
