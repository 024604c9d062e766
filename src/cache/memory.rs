use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{CacheBackend, CacheError};

enum Data {
    Value(String),
    Window(BTreeMap<i64, String>),
}

struct Entry {
    expires_at: Instant,
    data: Data,
}

/// TTL-aware in-process backend. Stands in for Redis in tests and when no
/// REDIS_URL is configured; per-process only, so it gives caching without
/// cross-instance invalidation.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => match &entry.data {
                Data::Value(v) => Ok(Some(v.clone())),
                Data::Window(_) => Ok(None),
            },
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                expires_at: Instant::now() + ttl,
                data: Data::Value(value.to_string()),
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn window_get(
        &self,
        key: &str,
        offset: i64,
        count: i64,
    ) -> Result<Vec<String>, CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => match &entry.data {
                Data::Window(window) => Ok(window
                    .range(offset..offset + count)
                    .map(|(_, v)| v.clone())
                    .collect()),
                Data::Value(_) => Ok(vec![]),
            },
            Some(_) => {
                entries.remove(key);
                Ok(vec![])
            }
            None => Ok(vec![]),
        }
    }

    async fn window_put(
        &self,
        key: &str,
        start_offset: i64,
        items: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let now = Instant::now();
        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if e.expires_at <= now || !matches!(e.data, Data::Window(_)) {
                    e.data = Data::Window(BTreeMap::new());
                }
            })
            .or_insert_with(|| Entry {
                expires_at: now + ttl,
                data: Data::Window(BTreeMap::new()),
            });
        entry.expires_at = now + ttl;
        if let Data::Window(window) = &mut entry.data {
            for (i, item) in items.iter().enumerate() {
                window.insert(start_offset + i as i64, item.clone());
            }
        }
        Ok(())
    }
}
