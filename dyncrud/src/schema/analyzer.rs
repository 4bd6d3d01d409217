//! Schema analyzer: cached catalog introspection

use std::sync::Arc;
use std::time::Duration;

use crate::db::CrudPool;
use crate::error::Result;
use crate::schema::{SchemaCache, TableSchema};

/// Default cache TTL (one hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Reads table schemas through an optional cache
///
/// The cache holds serialized schemas; a corrupt or failing cache never
/// breaks a read, it only forces a catalog query.
#[derive(Clone)]
pub struct SchemaAnalyzer {
    pool: CrudPool,
    cache: Option<Arc<dyn SchemaCache>>,
    ttl: Duration,
}

impl std::fmt::Debug for SchemaAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaAnalyzer")
            .field("pool", &self.pool)
            .field("cached", &self.cache.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SchemaAnalyzer {
    /// Analyzer without caching
    #[must_use]
    pub fn new(pool: CrudPool) -> Self {
        Self {
            pool,
            cache: None,
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Analyzer with a cache backend and TTL
    #[must_use]
    pub fn with_cache(pool: CrudPool, cache: Arc<dyn SchemaCache>, ttl: Duration) -> Self {
        Self {
            pool,
            cache: Some(cache),
            ttl,
        }
    }

    /// The wrapped pool
    #[must_use]
    pub fn pool(&self) -> &CrudPool {
        &self.pool
    }

    /// Read a table's schema, consulting the cache first
    pub async fn table_schema(&self, table: &str) -> Result<TableSchema> {
        let key = cache_key(table);

        if let Some(cache) = &self.cache {
            match cache.get(&key).await {
                Ok(Some(serialized)) => {
                    if let Ok(schema) = serde_json::from_str::<TableSchema>(&serialized) {
                        tracing::debug!(table, "schema cache hit");
                        return Ok(schema);
                    }
                    tracing::warn!(table, "discarding undecodable cached schema");
                }
                Ok(None) => tracing::debug!(table, "schema cache miss"),
                Err(e) => tracing::warn!(table, error = %e, "schema cache read failed"),
            }
        }

        let schema = self.pool.table_schema(table).await?;

        if let Some(cache) = &self.cache {
            match serde_json::to_string(&schema) {
                Ok(serialized) => {
                    if let Err(e) = cache.set(&key, serialized, self.ttl).await {
                        tracing::warn!(table, error = %e, "schema cache write failed");
                    }
                }
                Err(e) => tracing::warn!(table, error = %e, "schema serialization failed"),
            }
        }

        Ok(schema)
    }

    /// Drop the cached schema for a table; `true` if an entry was removed
    pub async fn invalidate(&self, table: &str) -> Result<bool> {
        match &self.cache {
            Some(cache) => cache.invalidate(&cache_key(table)).await,
            None => Ok(false),
        }
    }
}

fn cache_key(table: &str) -> String {
    format!("schema:{table}")
}
