//! Key index kept inside the cache store
//!
//! Two kinds of set record what is currently cached:
//! - `v{S}:idx:kind:{kind}` holds every live scope base of a kind
//! - `v{S}:idx:pages:{base}` holds the live page numbers of one paged scope
//!
//! Both are written with the entry TTL and refreshed on every registration,
//! so an index set outlives the entries it names. Registration sweeps a
//! kind's set at most once per prune interval and drops bases whose entries
//! have all expired. Keeping the index in the store lets every worker sharing
//! a networked store see the same index.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::cache::{
    base_identity, kind_index_key, pages_index_key, Cache, CacheKey, CacheKind,
};
use crate::domain::DomainError;

/// A delete that could not be carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeFailure {
    pub key: String,
    pub error: String,
}

/// Keys removed and deletes that failed while purging
#[derive(Debug, Clone, Default)]
pub struct PurgeOutcome {
    pub purged: Vec<String>,
    pub failures: Vec<PurgeFailure>,
}

impl PurgeOutcome {
    pub fn merge(&mut self, other: PurgeOutcome) {
        self.purged.extend(other.purged);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, key: impl Into<String>, error: DomainError) {
        self.failures.push(PurgeFailure {
            key: key.into(),
            error: error.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct KeyIndex {
    cache: Arc<dyn Cache>,
    ttl: Duration,
    /// Minimum time between sweeps of one kind's set
    prune_interval: Duration,
    last_prune: Arc<RwLock<HashMap<CacheKind, Instant>>>,
}

impl KeyIndex {
    /// Index writing its sets with `ttl`; kinds are swept once per `ttl`
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            prune_interval: ttl,
            last_prune: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = interval;
        self
    }

    /// Record a freshly populated key
    pub async fn register(&self, key: &CacheKey) -> Result<(), DomainError> {
        self.cache
            .set_add(&kind_index_key(key.kind()), key.base(), self.ttl)
            .await?;

        if let Some(page) = key.page() {
            self.cache
                .set_add(&pages_index_key(key.base()), &page.to_string(), self.ttl)
                .await?;
        }

        self.maybe_prune(key.kind()).await;

        Ok(())
    }

    async fn maybe_prune(&self, kind: CacheKind) {
        let due = {
            let last_prune = self.last_prune.read().await;
            last_prune
                .get(&kind)
                .is_none_or(|last| last.elapsed() >= self.prune_interval)
        };

        if !due {
            return;
        }

        {
            let mut last_prune = self.last_prune.write().await;
            if last_prune
                .get(&kind)
                .is_some_and(|last| last.elapsed() < self.prune_interval)
            {
                return;
            }
            last_prune.insert(kind, Instant::now());
        }

        if let Err(e) = self.prune(kind).await {
            warn!(kind = %kind, error = %e, "Failed to prune cache key index");
        }
    }

    /// Drop bases of `kind` whose entries have all expired
    ///
    /// Returns how many bases were dropped.
    pub async fn prune(&self, kind: CacheKind) -> Result<usize, DomainError> {
        let bases = self.cache.set_members(&kind_index_key(kind)).await?;
        let mut dropped = 0;

        for base in bases {
            if self.is_live(kind, &base).await? {
                continue;
            }

            self.cache.set_remove(&kind_index_key(kind), &base).await?;
            if kind.is_paged() {
                self.cache.delete(&pages_index_key(&base)).await?;
            }
            dropped += 1;
        }

        if dropped > 0 {
            debug!(kind = %kind, dropped, "Pruned expired scopes from key index");
        }

        Ok(dropped)
    }

    async fn is_live(&self, kind: CacheKind, base: &str) -> Result<bool, DomainError> {
        if !kind.is_paged() {
            return self.cache.exists(base).await;
        }

        for page in self.pages(base).await? {
            let key = CacheKey::for_page(kind, base, page);
            if self.cache.exists(key.as_str()).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Live scope bases of `kind`, optionally only those keyed on `identity`
    pub async fn scopes(
        &self,
        kind: CacheKind,
        identity: Option<&str>,
    ) -> Result<Vec<String>, DomainError> {
        let bases = self.cache.set_members(&kind_index_key(kind)).await?;

        Ok(match identity {
            Some(identity) => bases
                .into_iter()
                .filter(|base| base_identity(base) == Some(identity))
                .collect(),
            None => bases,
        })
    }

    /// Indexed page numbers of a scope, ascending
    pub async fn pages(&self, base: &str) -> Result<Vec<u32>, DomainError> {
        let mut pages: Vec<u32> = self
            .cache
            .set_members(&pages_index_key(base))
            .await?
            .iter()
            .filter_map(|member| member.parse().ok())
            .filter(|page| *page > 0)
            .collect();

        pages.sort_unstable();
        Ok(pages)
    }

    /// Forget one unpaged key's base, then delete the key
    pub async fn purge_key(&self, key: &CacheKey) -> PurgeOutcome {
        let mut outcome = PurgeOutcome::default();

        if let Err(e) = self
            .cache
            .set_remove(&kind_index_key(key.kind()), key.base())
            .await
        {
            outcome.fail(kind_index_key(key.kind()), e);
        }

        match self.cache.delete(key.as_str()).await {
            Ok(true) => outcome.purged.push(key.as_str().to_string()),
            Ok(false) => {}
            Err(e) => outcome.fail(key.as_str(), e),
        }

        outcome
    }

    /// Delete every page of a scope
    ///
    /// The scope is unlinked from the index before any page is deleted, so a
    /// page registered while the purge runs stays indexed for the next one.
    /// Indexed pages are deleted concurrently, then pages past the highest
    /// indexed one are deleted one by one until a miss, which covers
    /// registrations lost to a store error.
    pub async fn purge_scope(&self, kind: CacheKind, base: &str) -> PurgeOutcome {
        if !kind.is_paged() {
            let key = CacheKey::unpaged(kind, base);
            return self.purge_key(&key).await;
        }

        let mut outcome = PurgeOutcome::default();

        let pages = match self.pages(base).await {
            Ok(pages) => pages,
            Err(e) => {
                outcome.fail(pages_index_key(base), e);
                Vec::new()
            }
        };

        if let Err(e) = self.cache.set_remove(&kind_index_key(kind), base).await {
            outcome.fail(kind_index_key(kind), e);
        }

        if let Err(e) = self.cache.delete(&pages_index_key(base)).await {
            outcome.fail(pages_index_key(base), e);
        }

        let keys: Vec<CacheKey> = pages
            .iter()
            .map(|page| CacheKey::for_page(kind, base, *page))
            .collect();
        let results = join_all(keys.iter().map(|key| self.cache.delete(key.as_str()))).await;

        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(true) => outcome.purged.push(key.as_str().to_string()),
                Ok(false) => {}
                Err(e) => outcome.fail(key.as_str(), e),
            }
        }

        let mut next = pages.last().map_or(1, |last| last + 1);
        loop {
            let key = CacheKey::for_page(kind, base, next);
            match self.cache.delete(key.as_str()).await {
                Ok(true) => {
                    debug!(key = %key, "Purged unindexed page");
                    outcome.purged.push(key.as_str().to_string());
                    next += 1;
                }
                Ok(false) => break,
                Err(e) => {
                    outcome.fail(key.as_str(), e);
                    break;
                }
            }
        }

        outcome
    }
}
