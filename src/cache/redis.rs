//! Redis cache implementation
//!
//! Shares cached responses between instances. Values are JSON strings
//! written with SETEX under the `marketwire:` prefix, so a shared Redis
//! database is never flushed wholesale.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Keys fetched per SCAN round trip
const SCAN_COUNT: usize = 100;

/// Every key this service writes lives under this prefix
pub const KEY_NAMESPACE: &str = "marketwire:";

pub struct RedisCache {
    connection: MultiplexedConnection,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to Redis
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the connection cannot be established.
    pub async fn with_ttl(redis_url: &str, default_ttl: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            default_ttl,
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_NAMESPACE, key)
    }

    /// SETEX takes whole seconds and is capped by the default TTL
    fn expiry_secs(&self, ttl: Duration) -> u64 {
        ttl.min(self.default_ttl).as_secs().max(1)
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .get(Self::namespaced(key))
            .await
            .with_context(|| format!("Failed to read {} from Redis", key))?;

        raw.map(|json| serde_json::from_str(&json).context("Failed to deserialize cached value"))
            .transpose()
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(Self::namespaced(key), json, self.expiry_secs(ttl))
            .await
            .with_context(|| format!("Failed to write {} to Redis", key))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(Self::namespaced(key))
            .await
            .with_context(|| format!("Failed to delete {} from Redis", key))?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let pattern = Self::namespaced(pattern);
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .context("Failed to scan Redis keys")?;

            if !keys.is_empty() {
                let _: () = conn.del(&keys).await.context("Failed to delete Redis keys")?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }

    /// Only keys under [`KEY_NAMESPACE`] are removed
    async fn clear(&self) -> Result<()> {
        self.delete_pattern("*").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_set_get_and_pattern_delete() {
        let cache = RedisCache::with_ttl(&redis_url(), Duration::from_secs(60)).await.unwrap();
        let ttl = Duration::from_secs(30);

        cache.set("test:a", &1, ttl).await.unwrap();
        cache.set("test:b", &2, ttl).await.unwrap();

        let a: Option<i32> = cache.get("test:a").await.unwrap();
        assert_eq!(a, Some(1));

        cache.delete_pattern("test:*").await.unwrap();
        let b: Option<i32> = cache.get("test:b").await.unwrap();
        assert_eq!(b, None);
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(RedisCache::namespaced("response:/api/tabs"), "marketwire:response:/api/tabs");
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let result = RedisCache::with_ttl("not-a-redis-url", Duration::from_secs(60)).await;
        assert!(result.is_err());
    }
}
