//! In-memory cache implementation using moka

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use tokio::sync::Mutex;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Upper bound on any entry's lifetime, whatever TTL it was written with
    pub default_ttl: Duration,
    /// Time to idle - entries not accessed for this duration are evicted
    pub time_to_idle: Option<Duration>,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl: Duration::from_secs(3600),
            time_to_idle: None,
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }
}

/// Cache entry stored in moka
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Serialized JSON value
    data: String,
    /// Expiration timestamp (millis since epoch)
    expires_at: u64,
}

#[derive(Debug)]
struct SetEntry {
    members: BTreeSet<String>,
    expires_at: u64,
}

/// Thread-safe in-memory cache implementation using moka
///
/// Per-entry TTL is checked on every read, so an entry is never served past
/// its TTL even if moka has not evicted it yet. Index sets live next to the
/// moka cache under a mutex and carry their own expiry.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
    sets: Mutex<HashMap<String, SetEntry>>,
    config: InMemoryCacheConfig,
}

impl InMemoryCache {
    /// Creates a new in-memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    /// Creates a new in-memory cache with the given configuration
    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let mut builder = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.default_ttl);

        if let Some(tti) = config.time_to_idle {
            builder = builder.time_to_idle(tti);
        }

        Self {
            cache: builder.build(),
            sets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(expires_at: u64) -> bool {
        Self::current_time_millis() >= expires_at
    }

    fn expiry(ttl: Duration) -> u64 {
        Self::current_time_millis() + ttl.as_millis() as u64
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.cache.get(key).await {
            Some(entry) => {
                if Self::is_expired(entry.expires_at) {
                    self.cache.remove(key).await;
                    return Ok(None);
                }

                Ok(Some(entry.data))
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = CacheEntry {
            data: value.to_string(),
            expires_at: Self::expiry(ttl),
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let removed_entry = self
            .cache
            .remove(key)
            .await
            .is_some_and(|entry| !Self::is_expired(entry.expires_at));
        let removed_set = self.sets.lock().await.remove(key).is_some();

        Ok(removed_entry || removed_set)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut sets = self.sets.lock().await;

        if sets.len() as u64 >= self.config.max_capacity {
            sets.retain(|_, set| !Self::is_expired(set.expires_at));
        }

        let expires_at = Self::expiry(ttl);
        let set = sets.entry(key.to_string()).or_insert_with(|| SetEntry {
            members: BTreeSet::new(),
            expires_at,
        });

        if Self::is_expired(set.expires_at) {
            set.members.clear();
        }

        set.members.insert(member.to_string());
        set.expires_at = expires_at;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, DomainError> {
        let mut sets = self.sets.lock().await;

        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };

        let removed = set.members.remove(member) && !Self::is_expired(set.expires_at);

        if set.members.is_empty() || Self::is_expired(set.expires_at) {
            sets.remove(key);
        }

        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, DomainError> {
        let mut sets = self.sets.lock().await;

        match sets.get(key) {
            Some(set) if Self::is_expired(set.expires_at) => {
                sets.remove(key);
                Ok(Vec::new())
            }
            Some(set) => Ok(set.members.iter().cloned().collect()),
            None => Ok(Vec::new()),
        }
    }
}
