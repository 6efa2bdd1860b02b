//! Read-through accessor
//!
//! Serves cached payloads when present and otherwise computes them from the
//! source of record, stores them and registers the key in the index. The
//! store is an optimization only: every store failure degrades to a miss.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::domain::cache::{Cache, CacheKey};
use crate::domain::pagination::{Page, PageEnvelope, PageRequest};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_lookup, LookupOutcome};

use super::index::KeyIndex;

#[derive(Debug, Clone)]
pub struct ReadThroughCache {
    cache: Arc<dyn Cache>,
    index: KeyIndex,
    ttl: Duration,
}

impl ReadThroughCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            index: KeyIndex::new(cache.clone(), ttl),
            cache,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn index(&self) -> &KeyIndex {
        &self.index
    }

    /// Return the cached payload at `key`, or compute, cache and return it
    ///
    /// Errors from `compute` propagate and nothing is cached.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, DomainError>> + Send,
    {
        self.get_or_compute_with_ttl(key, self.ttl, compute).await
    }

    pub async fn get_or_compute_with_ttl<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, DomainError>> + Send,
    {
        if let Some(cached) = self.lookup::<T>(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        self.populate(key, &value, ttl).await;

        Ok(value)
    }

    /// Paginated variant: `query` fetches one page of entities, `serialize`
    /// turns them into final payloads, and the whole envelope is cached
    pub async fn get_or_compute_page<E, T, Q, QFut, S, SFut>(
        &self,
        key: &CacheKey,
        request: PageRequest,
        query: Q,
        serialize: S,
    ) -> Result<PageEnvelope<T>, DomainError>
    where
        E: Send,
        T: Serialize + DeserializeOwned + Send + Sync,
        Q: FnOnce(PageRequest) -> QFut + Send,
        QFut: Future<Output = Result<Page<E>, DomainError>> + Send,
        S: FnOnce(Vec<E>) -> SFut + Send,
        SFut: Future<Output = Result<Vec<T>, DomainError>> + Send,
    {
        if key.page() != Some(request.page()) || key.page_size() != Some(request.page_size()) {
            return Err(DomainError::internal(format!(
                "Cache key '{}' does not address page {} of size {}",
                key,
                request.page(),
                request.page_size()
            )));
        }

        self.get_or_compute(key, || async move {
            let page = query(request).await?;
            let total = page.total;
            let results = serialize(page.items).await?;

            Ok(PageEnvelope::new(
                Page {
                    items: results,
                    total,
                },
                request,
            ))
        })
        .await
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let kind = key.kind().as_str();

        match self.cache.get_raw(key.as_str()).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    record_cache_lookup(kind, LookupOutcome::Hit);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping undecodable cache entry");
                    record_cache_lookup(kind, LookupOutcome::Corrupt);

                    if let Err(e) = self.cache.delete(key.as_str()).await {
                        warn!(key = %key, error = %e, "Failed to drop cache entry");
                    }
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                record_cache_lookup(kind, LookupOutcome::Miss);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, using source of record");
                record_cache_lookup(kind, LookupOutcome::Error);
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize payload for cache");
                return;
            }
        };

        if let Err(e) = self.cache.set_raw(key.as_str(), &raw, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
            return;
        }

        if let Err(e) = self.index.register(key).await {
            warn!(key = %key, error = %e, "Failed to index cache key");
        }
    }
}
