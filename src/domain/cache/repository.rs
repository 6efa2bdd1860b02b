//! Cache store trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Key-value store with per-entry TTL
///
/// This trait uses JSON strings internally to be dyn-compatible.
/// Use the helper methods for typed get/set operations. The set primitives
/// back the key index; members are plain strings.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw JSON value from the cache
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value in the cache with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a value from the cache
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Returns approximate number of entries in the cache
    async fn size(&self) -> Result<usize, DomainError>;

    /// Adds a member to the set at `key` and resets the set's TTL
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Removes a member from the set at `key`
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, DomainError>;

    /// Members of the set at `key`, empty when absent
    async fn set_members(&self, key: &str) -> Result<Vec<String>, DomainError>;
}

/// Extension trait providing typed get/set operations
pub trait CacheExt: Cache {
    /// Gets a typed value from the cache
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cache value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value in the cache with a TTL
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }
}

// Blanket implementation for all types implementing Cache
impl<T: Cache + ?Sized> CacheExt for T {}
