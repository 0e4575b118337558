use crate::domain::{AiProvider, Completion};
use crate::infrastructure::security::{
    ManualClock, MemoryStore, RateLimitConfig, RateLimitTable, RateLimiter,
};
use aigov_errors::GovernanceError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider that replays a fixed list of outcomes.
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<Completion, GovernanceError>>>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<Completion, GovernanceError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<Completion, GovernanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GovernanceError::Unknown("script exhausted".to_string())))
    }
}

pub fn limiter_with(
    operation: &str,
    config: RateLimitConfig,
) -> (RateLimiter, Arc<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let table = RateLimitTable::from_entries([(operation.to_string(), config)]);
    let limiter = RateLimiter::new(store.clone(), Arc::new(table), clock.clone(), true);
    (limiter, store, clock)
}
