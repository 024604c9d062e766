//! Cache-backed read path.
//!
//! Selected list/search reads are wrapped in a keyed, TTL-bound cache. The
//! cache is strictly an accelerator: any backend failure is logged and
//! treated as a miss, and every entity write deletes the keys it could have
//! made stale. Windowed collections are valid only when they hold exactly
//! the expected contiguous count for the requested window.

pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub use memory::MemoryBackend;
pub use redis::RedisBackend;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),

    #[error("Cache pool error: {0}")]
    Pool(String),
}

/// Key-value operations the read path needs. Implemented by Redis in
/// production and by an in-memory map in tests.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;
    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError>;
    async fn window_get(&self, key: &str, offset: i64, count: i64)
        -> Result<Vec<String>, CacheError>;
    async fn window_put(
        &self,
        key: &str,
        start_offset: i64,
        items: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

/// How many entries a complete cached window must hold for a collection of
/// `total` rows read at `offset` with the given `limit`.
pub fn expected_window(total: i64, offset: i64, limit: i64) -> i64 {
    (total - offset).clamp(0, limit)
}

/// Serializing facade over a [`CacheBackend`]. All methods swallow backend
/// and serde errors: reads become misses, writes become no-ops.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl Cache {
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("cache get failed for {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("cache entry for {} failed to deserialize: {}", key, e);
                None
            }
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache value for {} failed to serialize: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.backend.put(key, &raw, self.ttl).await {
            warn!("cache put failed for {}: {}", key, e);
        }
    }

    pub async fn get_count(&self, key: &str) -> Option<i64> {
        self.get_json(key).await
    }

    pub async fn put_count(&self, key: &str, count: i64) {
        self.put_json(key, &count).await;
    }

    /// Read a window of entries. `None` means the backend failed or an entry
    /// was undecodable; callers treat both as a miss. A `Some` result still
    /// has to be length-checked against [`expected_window`].
    pub async fn window_get<T: DeserializeOwned>(
        &self,
        key: &str,
        offset: i64,
        count: i64,
    ) -> Option<Vec<T>> {
        let raw = match self.backend.window_get(key, offset, count).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache window read failed for {}: {}", key, e);
                return None;
            }
        };
        let mut out = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str(&entry) {
                Ok(value) => out.push(value),
                Err(e) => {
                    warn!("cache window entry for {} failed to deserialize: {}", key, e);
                    return None;
                }
            }
        }
        Some(out)
    }

    pub async fn window_put<T: Serialize>(&self, key: &str, start_offset: i64, items: &[T]) {
        let mut raw = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::to_string(item) {
                Ok(entry) => raw.push(entry),
                Err(e) => {
                    warn!("cache window item for {} failed to serialize: {}", key, e);
                    return;
                }
            }
        }
        if let Err(e) = self.backend.window_put(key, start_offset, &raw, self.ttl).await {
            warn!("cache window put failed for {}: {}", key, e);
        }
    }

    pub async fn invalidate(&self, keys: &[String]) {
        if let Err(e) = self.backend.delete(keys).await {
            warn!("cache invalidation failed for {:?}: {}", keys, e);
        }
    }

    pub async fn invalidate_prefix(&self, prefix: &str) {
        if let Err(e) = self.backend.delete_prefix(prefix).await {
            warn!("cache prefix invalidation failed for {}: {}", prefix, e);
        }
    }
}
