//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::CacheSettings;
use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheType {
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis cache
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_type: CacheType,
    /// Required for Redis
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Lifetime ceiling for in-memory entries
    pub default_ttl: Duration,
    pub max_capacity: Option<u64>,
    pub connection_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            default_ttl: Duration::from_secs(300),
            max_capacity: Some(100_000),
            connection_timeout: Duration::from_secs(2),
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Translate the application's cache section
    pub fn from_settings(settings: &CacheSettings) -> Result<Self, DomainError> {
        Ok(Self {
            cache_type: settings.backend.parse()?,
            redis_url: settings.redis_url.clone(),
            key_prefix: settings.key_prefix.clone(),
            default_ttl: settings.ttl(),
            max_capacity: Some(settings.max_capacity),
            connection_timeout: Duration::from_millis(settings.connection_timeout_ms),
        })
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache instance based on configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        match config.cache_type {
            CacheType::InMemory => Ok(self.create_in_memory(config)),
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let mut redis_config = RedisCacheConfig::new(url)
                    .with_connection_timeout(config.connection_timeout);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let cache = RedisCache::new(redis_config).await?;
                Ok(Arc::new(cache))
            }
        }
    }

    /// Like `create`, but an unreachable Redis falls back to the in-memory store
    ///
    /// Configuration errors still fail.
    pub async fn create_or_fallback(
        &self,
        config: &CacheConfig,
    ) -> Result<Arc<dyn Cache>, DomainError> {
        match self.create(config).await {
            Ok(cache) => {
                info!(backend = %config.cache_type, "Cache store ready");
                Ok(cache)
            }
            Err(DomainError::Cache { message }) => {
                warn!(
                    backend = %config.cache_type,
                    error = %message,
                    "Cache store unreachable, falling back to in-memory cache"
                );
                Ok(self.create_in_memory(config))
            }
            Err(e) => Err(e),
        }
    }

    fn create_in_memory(&self, config: &CacheConfig) -> Arc<dyn Cache> {
        let mut in_memory_config =
            InMemoryCacheConfig::default().with_default_ttl(config.default_ttl);

        if let Some(capacity) = config.max_capacity {
            in_memory_config = in_memory_config.with_max_capacity(capacity);
        }

        Arc::new(InMemoryCache::with_config(in_memory_config))
    }
}
