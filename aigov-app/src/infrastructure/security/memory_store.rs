use super::clock::Clock;
use super::store::{RateLimitRecord, RateLimitStore, RecordUpdate, StoreWrite};
use aigov_errors::GovernanceError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const DEFAULT_TTL_MS: i64 = 60_000;

#[derive(Clone)]
struct StoredEntry {
    record: RateLimitRecord,
    expires_at: i64,
}

impl StoredEntry {
    fn is_live(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Single-process store. Expiry is checked on every read; the sweeper only
/// reclaims memory.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate limit records");
        }
        removed
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        let now = self.clock.now_ms();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stored(&self, key: &str, write: StoreWrite, now: i64) -> Result<StoredEntry, GovernanceError> {
        if write.ttl_ms <= 0 {
            return Err(GovernanceError::Store(format!(
                "TTL must be positive, got {}ms for {}",
                write.ttl_ms, key
            )));
        }
        Ok(StoredEntry {
            record: write.record,
            expires_at: now.saturating_add(write.ttl_ms),
        })
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.sweep_expired();
            }
        })
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, GovernanceError> {
        let now = self.clock.now_ms();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.record.clone()))
    }

    async fn set(&self, key: &str, record: RateLimitRecord, ttl_ms: i64) -> Result<(), GovernanceError> {
        let entry = self.stored(key, StoreWrite { record, ttl_ms }, self.clock.now_ms())?;
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    /// Runs `apply` while holding the shard lock for `key`.
    async fn update(&self, key: &str, apply: &mut RecordUpdate<'_>) -> Result<(), GovernanceError> {
        let now = self.clock.now_ms();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = Some(occupied.get())
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.record.clone());
                if let Some(write) = apply(current) {
                    occupied.insert(self.stored(key, write, now)?);
                }
            }
            Entry::Vacant(vacant) => {
                if let Some(write) = apply(None) {
                    vacant.insert(self.stored(key, write, now)?);
                }
            }
        }
        Ok(())
    }

    async fn increment(&self, key: &str, amount: u32) -> Result<u32, GovernanceError> {
        let now = self.clock.now_ms();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredEntry {
                record: RateLimitRecord::fresh(now),
                expires_at: now + DEFAULT_TTL_MS,
            });

        if !entry.is_live(now) {
            *entry = StoredEntry {
                record: RateLimitRecord::fresh(now),
                expires_at: now + DEFAULT_TTL_MS,
            };
        }

        entry.record.requests = entry.record.requests.saturating_add(amount);
        Ok(entry.record.requests)
    }

    async fn delete(&self, key: &str) -> Result<bool, GovernanceError> {
        let now = self.clock.now_ms();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| entry.is_live(now)))
    }
}
