use async_trait::async_trait;
use bb8_redis::{bb8, RedisConnectionManager};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

use super::{CacheBackend, CacheError};

/// Redis backend over a bb8 connection pool.
///
/// Windowed collections are sorted sets scored by absolute offset, so a
/// later request for a window can be answered by a score-range read.
pub struct RedisBackend {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisBackend {
    pub async fn connect(url: &str, pool_size: u32) -> Result<Self, CacheError> {
        let manager =
            RedisConnectionManager::new(url).map_err(CacheError::Redis)?;
        let pool = bb8::Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .await
            .map_err(CacheError::Redis)?;
        info!("redis cache pool ready (max_size={})", pool_size);
        Ok(Self { pool })
    }

    async fn conn(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(e.to_string()))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let () = conn.del(keys).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut *conn)
                .await?;
            if !keys.is_empty() {
                let () = conn.del(keys).await?;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(())
    }

    async fn window_get(
        &self,
        key: &str,
        offset: i64,
        count: i64,
    ) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn().await?;
        let entries: Vec<String> = conn
            .zrangebyscore(key, offset, offset + count - 1)
            .await?;
        Ok(entries)
    }

    async fn window_put(
        &self,
        key: &str,
        start_offset: i64,
        items: &[String],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let scored: Vec<(i64, &str)> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (start_offset + i as i64, item.as_str()))
            .collect();
        let () = conn.zadd_multiple(key, &scored).await?;
        let () = conn.expire(key, ttl.as_secs() as i64).await?;
        Ok(())
    }
}
