//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// How long start-up waits for the first connection
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis cache implementation
///
/// Entries are plain strings written with `SET EX`; index sets use
/// `SADD` followed by `EXPIRE` in one pipeline. The connection manager
/// reconnects on its own, so a Redis outage surfaces as per-call errors.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisCache {
    /// Connects to Redis, failing if no connection is made within the timeout
    pub async fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let connection = tokio::time::timeout(
            config.connection_timeout,
            ConnectionManager::new(client),
        )
        .await
        .map_err(|_| {
            DomainError::cache(format!(
                "Timed out connecting to Redis after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    DomainError::cache(format!(
                        "Failed to scan keys with pattern '{}': {}",
                        pattern, e
                    ))
                })?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn.get(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        Ok(result)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let _: () = conn
            .set_ex(&prefixed_key, value, Self::ttl_secs(ttl))
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let exists: bool = conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })?;

        Ok(exists)
    }

    async fn size(&self) -> Result<usize, DomainError> {
        match &self.config.key_prefix {
            Some(_) => Ok(self.scan(&self.prefix_key("*")).await?.len()),
            None => {
                let mut conn = self.connection.clone();
                let size: usize = redis::cmd("DBSIZE")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| {
                        DomainError::cache(format!("Failed to get database size: {}", e))
                    })?;
                Ok(size)
            }
        }
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .atomic()
            .sadd(&prefixed_key, member)
            .ignore()
            .expire(&prefixed_key, Self::ttl_secs(ttl) as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::cache(format!("Failed to add to set '{}': {}", key, e))
            })?;

        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let removed: i32 = conn.srem(&prefixed_key, member).await.map_err(|e| {
            DomainError::cache(format!("Failed to remove from set '{}': {}", key, e))
        })?;

        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let mut members: Vec<String> = conn.smembers(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to read set '{}': {}", key, e))
        })?;

        members.sort();
        Ok(members)
    }
}
