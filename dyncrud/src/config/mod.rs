//! Configuration management
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `DYNCRUD_` prefix,
//!    `__` as the section separator)
//! 2. `./dyncrud.toml` (development)
//! 3. `~/.config/dyncrud/config.toml` (user config)
//! 4. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # dyncrud.toml
//! [database]
//! url = "postgres://localhost/app"
//! max_connections = 10
//!
//! [schema_cache]
//! enabled = true
//! ttl_secs = 3600
//! backend = "memory"
//!
//! [uploads]
//! dir = "./uploads"
//! public_prefix = "/uploads"
//!
//! [security]
//! csrf_secret = "change-me"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::db::CrudPool;
use crate::error::{DynCrudError, Result};
use crate::schema::{MemorySchemaCache, SchemaCache};
use crate::security::CsrfProtect;
use crate::uploads::LocalFileStorage;

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection URL; the scheme selects the dialect
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 10,
        }
    }
}

/// Schema cache backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process map (default)
    Memory,
    /// Redis, shared across processes (requires the `redis` feature)
    Redis,
}

/// Schema cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaCacheSettings {
    /// Whether schemas are cached at all
    pub enabled: bool,
    /// Time-to-live in seconds
    pub ttl_secs: u64,
    /// Backend selection
    pub backend: CacheBackend,
    /// Redis URL when the backend is `redis`
    pub redis_url: Option<String>,
}

impl Default for SchemaCacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            backend: CacheBackend::Memory,
            redis_url: None,
        }
    }
}

/// Upload storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Directory uploads are written to
    pub dir: PathBuf,
    /// Public prefix persisted into file columns
    pub public_prefix: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./uploads"),
            public_prefix: "/uploads".into(),
        }
    }
}

/// Security settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// CSRF signing secret; omit for a random per-process secret
    pub csrf_secret: Option<String>,
}

/// Complete dyncrud configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudConfig {
    /// Database settings
    pub database: DatabaseSettings,
    /// Schema cache settings
    pub schema_cache: SchemaCacheSettings,
    /// Upload settings
    pub uploads: UploadSettings,
    /// Security settings
    pub security: SecuritySettings,
}

impl CrudConfig {
    /// Load configuration from the standard locations
    pub fn load() -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::user_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Toml::file("dyncrud.toml"))
            .merge(Env::prefixed("DYNCRUD_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file (plus environment overrides)
    pub fn load_from(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DYNCRUD_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// The user-level config file location, if a config dir exists
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dyncrud").join("config.toml"))
    }

    /// Connect a pool per the database settings
    pub async fn connect(&self) -> Result<CrudPool> {
        CrudPool::connect_with(&self.database.url, self.database.max_connections).await
    }

    /// Cache TTL as a duration
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.schema_cache.ttl_secs)
    }

    /// Build the configured schema cache, `None` when caching is disabled
    pub fn cache(&self) -> Result<Option<Arc<dyn SchemaCache>>> {
        if !self.schema_cache.enabled {
            return Ok(None);
        }
        match self.schema_cache.backend {
            CacheBackend::Memory => Ok(Some(Arc::new(MemorySchemaCache::new()))),
            #[cfg(feature = "redis")]
            CacheBackend::Redis => {
                let url = self.schema_cache.redis_url.as_deref().ok_or_else(|| {
                    DynCrudError::Config("schema_cache.redis_url is required for the redis backend".into())
                })?;
                Ok(Some(Arc::new(crate::schema::cache::RedisSchemaCache::new(url)?)))
            }
            #[cfg(not(feature = "redis"))]
            CacheBackend::Redis => Err(DynCrudError::Config(
                "the redis cache backend requires the `redis` feature".into(),
            )),
        }
    }

    /// Build the configured CSRF protector
    #[must_use]
    pub fn csrf(&self) -> CsrfProtect {
        match &self.security.csrf_secret {
            Some(secret) => CsrfProtect::new(secret),
            None => CsrfProtect::random(),
        }
    }

    /// Build the configured upload storage
    #[must_use]
    pub fn storage(&self) -> LocalFileStorage {
        LocalFileStorage::new(self.uploads.dir.clone())
            .with_public_prefix(self.uploads.public_prefix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrudConfig::default();
        assert_eq!(config.database.max_connections, 10);
        assert!(config.schema_cache.enabled);
        assert_eq!(config.schema_cache.ttl_secs, 3600);
        assert_eq!(config.schema_cache.backend, CacheBackend::Memory);
        assert_eq!(config.uploads.public_prefix, "/uploads");
        assert!(config.security.csrf_secret.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[database]\nurl = \"postgres://db/app\"\n\n[schema_cache]\nttl_secs = 60\n",
        )
        .unwrap();

        let config = CrudConfig::load_from(&path).unwrap();
        assert_eq!(config.database.url, "postgres://db/app");
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        // Untouched sections keep their defaults.
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_disabled_cache_builds_none() {
        let config = CrudConfig {
            schema_cache: SchemaCacheSettings {
                enabled: false,
                ..SchemaCacheSettings::default()
            },
            ..CrudConfig::default()
        };
        assert!(config.cache().unwrap().is_none());
    }
}
