use aigov_errors::GovernanceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_BLOCK_DURATION_MS: i64 = 5 * 60 * 1000;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

/// Operation names the limiter knows about.
pub mod operations {
    pub const INSIGHT_GENERATION: &str = "insight_generation";
    pub const BLOCK_ANALYSIS: &str = "block_analysis";
    pub const REFLECTION_SUMMARY: &str = "reflection_summary";
    pub const PROFILE_ANALYSIS: &str = "profile_analysis";
    pub const CHAT_MESSAGE: &str = "chat_message";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_ms: i64,
    pub max_tokens: Option<u64>,
    pub block_duration_ms: Option<i64>,
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window_ms: i64) -> Self {
        Self {
            max_requests,
            window_ms,
            max_tokens: None,
            block_duration_ms: None,
        }
    }

    pub const fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub const fn with_block_duration(mut self, block_duration_ms: i64) -> Self {
        self.block_duration_ms = Some(block_duration_ms);
        self
    }

    pub fn block_duration(&self) -> i64 {
        self.block_duration_ms.unwrap_or(DEFAULT_BLOCK_DURATION_MS)
    }
}

const STRICT: &[(&str, RateLimitConfig)] = &[
    (
        operations::INSIGHT_GENERATION,
        RateLimitConfig::new(10, HOUR_MS).with_max_tokens(20_000),
    ),
    (
        operations::BLOCK_ANALYSIS,
        RateLimitConfig::new(20, HOUR_MS).with_max_tokens(30_000),
    ),
    (
        operations::REFLECTION_SUMMARY,
        RateLimitConfig::new(5, HOUR_MS)
            .with_max_tokens(10_000)
            .with_block_duration(15 * MINUTE_MS),
    ),
    (
        operations::PROFILE_ANALYSIS,
        RateLimitConfig::new(3, 24 * HOUR_MS)
            .with_max_tokens(8_000)
            .with_block_duration(HOUR_MS),
    ),
    (
        operations::CHAT_MESSAGE,
        RateLimitConfig::new(30, 10 * MINUTE_MS)
            .with_max_tokens(15_000)
            .with_block_duration(2 * MINUTE_MS),
    ),
];

const RELAXED: &[(&str, RateLimitConfig)] = &[
    (
        operations::INSIGHT_GENERATION,
        RateLimitConfig::new(100, HOUR_MS).with_max_tokens(200_000),
    ),
    (
        operations::BLOCK_ANALYSIS,
        RateLimitConfig::new(200, HOUR_MS).with_max_tokens(300_000),
    ),
    (
        operations::REFLECTION_SUMMARY,
        RateLimitConfig::new(50, HOUR_MS)
            .with_max_tokens(100_000)
            .with_block_duration(MINUTE_MS),
    ),
    (
        operations::PROFILE_ANALYSIS,
        RateLimitConfig::new(30, HOUR_MS)
            .with_max_tokens(80_000)
            .with_block_duration(MINUTE_MS),
    ),
    (
        operations::CHAT_MESSAGE,
        RateLimitConfig::new(300, 10 * MINUTE_MS)
            .with_max_tokens(150_000)
            .with_block_duration(30 * 1000),
    ),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitProfile {
    #[default]
    Strict,
    Relaxed,
}

impl FromStr for RateLimitProfile {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "production" => Ok(Self::Strict),
            "relaxed" | "development" => Ok(Self::Relaxed),
            other => Err(GovernanceError::configuration(format!(
                "Unknown rate limit profile: {}",
                other
            ))),
        }
    }
}

/// Read-only lookup of per-operation configs, built once at start-up.
#[derive(Debug, Clone)]
pub struct RateLimitTable {
    configs: HashMap<String, RateLimitConfig>,
}

impl RateLimitTable {
    pub fn for_profile(profile: RateLimitProfile) -> Self {
        let entries = match profile {
            RateLimitProfile::Strict => STRICT,
            RateLimitProfile::Relaxed => RELAXED,
        };
        Self::from_entries(entries.iter().map(|(name, cfg)| (name.to_string(), *cfg)))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, RateLimitConfig)>) -> Self {
        Self {
            configs: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, operation: &str) -> Option<&RateLimitConfig> {
        self.configs.get(operation)
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}
