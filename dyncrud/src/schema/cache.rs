//! Pluggable schema cache
//!
//! Catalog queries are cheap but not free, and schemas change rarely; the
//! analyzer caches serialized [`TableSchema`](super::TableSchema) values
//! under `schema:{table}` keys with a TTL. The in-memory backend is the
//! default; a Redis backend is available behind the `redis` feature for
//! multi-process deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;

/// Storage backend for cached schemas
///
/// Values are opaque serialized strings so backends stay trivial.
#[async_trait]
pub trait SchemaCache: Send + Sync {
    /// Fetch a cached value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Store a value with a time-to-live
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    /// Remove a value; `true` if something was removed
    async fn invalidate(&self, key: &str) -> Result<bool>;
}

/// In-process cache backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemorySchemaCache {
    entries: Mutex<HashMap<String, (Instant, String)>>,
}

impl MemorySchemaCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaCache for MemorySchemaCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), (Instant::now() + ttl, value));
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }
}

/// Redis-backed cache for sharing schemas across processes
#[cfg(feature = "redis")]
pub struct RedisSchemaCache {
    pool: deadpool_redis::Pool,
}

#[cfg(feature = "redis")]
impl RedisSchemaCache {
    /// Connect to Redis at the given URL
    pub fn new(url: &str) -> Result<Self> {
        let pool = deadpool_redis::Config::from_url(url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| crate::error::DynCrudError::Cache(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| crate::error::DynCrudError::Cache(e.to_string()))
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl SchemaCache for RedisSchemaCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        use deadpool_redis::redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.get(key)
            .await
            .map_err(|e| crate::error::DynCrudError::Cache(e.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        use deadpool_redis::redis::AsyncCommands;
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(|e| crate::error::DynCrudError::Cache(e.to_string()))
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        use deadpool_redis::redis::AsyncCommands;
        let mut conn = self.conn().await?;
        let removed: i64 = conn
            .del(key)
            .await
            .map_err(|e| crate::error::DynCrudError::Cache(e.to_string()))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemorySchemaCache::new();
        cache
            .set("schema:users", "{}".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("schema:users").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemorySchemaCache::new();
        cache
            .set("schema:users", "{}".into(), Duration::from_secs(0))
            .await
            .unwrap();
        assert_eq!(cache.get("schema:users").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_invalidate() {
        let cache = MemorySchemaCache::new();
        cache
            .set("k", "v".into(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.invalidate("k").await.unwrap());
        assert!(!cache.invalidate("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }
}
