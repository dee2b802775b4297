//! Key-value store behind the rate limiter and the response cache.
//!
//! Two interchangeable backends: [`RedisStore`] for deployments with shared
//! state across processes, [`MemoryStore`] as a single-process fallback.
//! Selection happens once at startup; callers only see [`KvStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{Clock, SystemClock};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically increments `key` and returns the new count, creating the
    /// key with count 1 and the given TTL when absent.
    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<u64, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;
}

/// INCR with EXPIRE applied only on creation, so concurrent increments from
/// multiple gateway instances serialize on the redis side.
const INCR_WITH_TTL_SCRIPT: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
  redis.call("EXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    prefix: String,
}

impl RedisStore {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            prefix: "concierge".to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: Option<String> = conn.get(self.namespaced("__ping__")).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        let script = redis::Script::new(INCR_WITH_TTL_SCRIPT);
        let count: u64 = script
            .key(self.namespaced(key))
            .arg(ttl_seconds.max(1))
            .invoke_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(self.namespaced(key)).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(self.namespaced(key), value, ttl_seconds).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: u64,
}

/// In-process fallback store. Single gateway instance only; contents are
/// lost on restart. Expired entries are evicted lazily on read.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str, ttl_seconds: u64) -> Result<u64, StoreError> {
        let now = self.clock.now_epoch_seconds();
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| MemoryEntry {
                value: "0".to_string(),
                expires_at: now.saturating_add(ttl_seconds),
            });
        if entry.expires_at <= now {
            entry.value = "0".to_string();
            entry.expires_at = now.saturating_add(ttl_seconds);
        }
        let next = entry.value.parse::<u64>().unwrap_or(0).saturating_add(1);
        entry.value = next.to_string();
        Ok(next)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now_epoch_seconds();
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at <= now {
            entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        if ttl_seconds == 0 {
            return Ok(());
        }
        let now = self.clock.now_epoch_seconds();
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: now.saturating_add(ttl_seconds),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    struct ManualClock(AtomicU64);

    impl Clock for ManualClock {
        fn now_epoch_seconds(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn store_at(epoch: u64) -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicU64::new(epoch)));
        (MemoryStore::with_clock(clock.clone()), clock)
    }

    #[tokio::test]
    async fn incr_counts_up_within_ttl() {
        let (store, _clock) = store_at(100);
        assert_eq!(store.incr("k", 60).await.unwrap(), 1);
        assert_eq!(store.incr("k", 60).await.unwrap(), 2);
        assert_eq!(store.incr("k", 60).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incr_resets_after_expiry() {
        let (store, clock) = store_at(100);
        assert_eq!(store.incr("k", 10).await.unwrap(), 1);
        clock.0.store(110, Ordering::Relaxed);
        assert_eq!(store.incr("k", 10).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_evicts_expired_entries() {
        let (store, clock) = store_at(100);
        store.set_ex("k", "v", 10).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        clock.0.store(110, Ordering::Relaxed);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.entries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn set_ex_with_zero_ttl_is_a_no_op() {
        let (store, _clock) = store_at(100);
        store.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
