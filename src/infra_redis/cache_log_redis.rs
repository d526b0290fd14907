use crate::domain_model::CacheKey;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use redis::streams::{StreamMaxlen, StreamRangeReply};
use std::time::Duration;

const PAYLOAD_FIELD: &str = "payload";
/// Approximate stream length kept per key; only the last entry is read.
const MAX_STREAM_LEN: usize = 16;
const SCAN_BATCH: usize = 100;

/// One Redis stream per cache key. A write is `XADD` + `EXPIRE`; a read is the last entry.
pub struct RedisCacheLog {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCacheLog {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisCacheLog {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::transport)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheLog for RedisCacheLog {
    async fn append(
        &self,
        key: &CacheKey,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = self.key(key);
        let ttl_secs = ttl.as_secs().max(1) as i64;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .xadd_maxlen(
                &key,
                StreamMaxlen::Approx(MAX_STREAM_LEN),
                "*",
                &[(PAYLOAD_FIELD, payload)],
            )
            .ignore()
            .expire(&key, ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::transport)?;
        Ok(())
    }

    async fn read_latest(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let reply: StreamRangeReply = conn
            .xrevrange_count(&key, "+", "-", 1)
            .await
            .map_err(CacheError::transport)?;

        let Some(entry) = reply.ids.first() else {
            return Ok(None);
        };
        entry
            .get::<String>(PAYLOAD_FIELD)
            .map(Some)
            .ok_or_else(|| {
                CacheError::Transport(format!("entry {} of {} has no payload", entry.id, key))
            })
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let _: u64 = conn.del(&key).await.map_err(CacheError::transport)?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), CacheError> {
        let pattern = format!("{}:*", self.prefix);
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::transport)?;

            if !keys.is_empty() {
                let _: u64 = conn.del(&keys).await.map_err(CacheError::transport)?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}
