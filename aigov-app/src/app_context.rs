use crate::application::{GenerateInsight, GovernedCall, SummarizeReflection};
use crate::config::GovernanceConfig;
use crate::domain::AiProvider;
use crate::infrastructure::security::{Clock, MemoryStore, RateLimitTable, RateLimiter, SystemClock};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything an AI-invoking call site needs, built once per process.
#[derive(Clone)]
pub struct AppContext {
    pub generate_insight: Arc<GenerateInsight>,
    pub summarize_reflection: Arc<SummarizeReflection>,
    pub rate_limiter: RateLimiter,
    store: MemoryStore,
    config: GovernanceConfig,
}

impl AppContext {
    pub fn new(config: GovernanceConfig, provider: Arc<dyn AiProvider>) -> Self {
        Self::with_clock(config, provider, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GovernanceConfig, provider: Arc<dyn AiProvider>, clock: Arc<dyn Clock>) -> Self {
        let store = MemoryStore::new(clock.clone());
        let table = Arc::new(RateLimitTable::for_profile(config.profile));
        let rate_limiter = RateLimiter::new(
            Arc::new(store.clone()),
            table,
            clock,
            config.rate_limit_enabled,
        );
        let governed = GovernedCall::new(rate_limiter.clone(), config.max_attempts);

        Self {
            generate_insight: Arc::new(GenerateInsight::new(provider.clone(), governed.clone())),
            summarize_reflection: Arc::new(SummarizeReflection::new(provider, governed)),
            rate_limiter,
            store,
            config,
        }
    }

    #[cfg(feature = "openrouter")]
    pub fn from_env() -> Result<Self, aigov_errors::GovernanceError> {
        use crate::infrastructure::openrouter::OpenRouterClient;
        use aigov_errors::GovernanceError;

        let config = GovernanceConfig::from_env()?;
        let api_key = config
            .openrouter_api_key
            .clone()
            .ok_or_else(|| GovernanceError::configuration("OPENROUTER_API_KEY must be set"))?;
        tracing::info!(
            model = %config.openrouter_model,
            profile = ?config.profile,
            rate_limit_enabled = config.rate_limit_enabled,
            "Using OpenRouter backend"
        );
        let provider = Arc::new(OpenRouterClient::new(api_key, config.openrouter_model.clone()));
        Ok(Self::new(config, provider))
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Starts the store sweeper when configured. Must run inside a tokio runtime.
    pub fn start_background_tasks(&self) -> Option<JoinHandle<()>> {
        let every = self.config.sweep_interval?;
        tracing::info!(every_secs = every.as_secs(), "Starting rate limit store sweeper");
        Some(self.store.spawn_sweeper(every))
    }
}
