use crate::domain_model::CacheKey;
use crate::domain_port::*;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Entries kept per key. Only the newest is ever read.
const MAX_ENTRIES: usize = 8;

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-process stand-in for the Redis stream log.
#[derive(Default)]
pub struct MemoryCacheLog {
    logs: DashMap<CacheKey, VecDeque<Entry>>,
}

impl MemoryCacheLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently holding at least one entry, expired or not.
    pub fn key_count(&self) -> usize {
        self.logs.len()
    }
}

#[async_trait::async_trait]
impl CacheLog for MemoryCacheLog {
    async fn append(
        &self,
        key: &CacheKey,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut log = self.logs.entry(key.clone()).or_default();
        log.push_back(Entry {
            payload: payload.to_string(),
            expires_at: Instant::now() + ttl,
        });
        while log.len() > MAX_ENTRIES {
            log.pop_front();
        }
        Ok(())
    }

    async fn read_latest(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        let latest = self.logs.get(key).and_then(|log| {
            log.back()
                .filter(|entry| entry.expires_at > now)
                .map(|entry| entry.payload.clone())
        });
        if latest.is_none() {
            self.logs
                .remove_if(key, |_, log| log.back().is_none_or(|e| e.expires_at <= now));
        }
        Ok(latest)
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.logs.remove(key);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        self.logs.clear();
        Ok(())
    }
}
