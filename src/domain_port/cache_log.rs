use crate::domain_model::CacheKey;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache transport error: {0}")]
    Transport(String),
}

impl CacheError {
    pub fn transport<E: std::fmt::Display>(error: E) -> Self {
        CacheError::Transport(error.to_string())
    }
}

/// Append-only log transport behind the record cache.
/// Each key is its own log; only the newest live entry is ever read back.
#[async_trait::async_trait]
pub trait CacheLog: Send + Sync {
    async fn append(&self, key: &CacheKey, payload: &str, ttl: Duration)
    -> Result<(), CacheError>;

    /// `Ok(None)` when the log is empty, expired or was never written.
    async fn read_latest(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Drop every key this log owns.
    async fn clear_all(&self) -> Result<(), CacheError>;
}
