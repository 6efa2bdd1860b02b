//! Follow toggling and cached follower statistics

use std::sync::Arc;

use crate::domain::cache::{build_key, CacheKind, KeyScope, MutationEvent, MutationKind};
use crate::domain::engagement::{FollowRepository, FollowToggle};
use crate::domain::pagination::{PageEnvelope, PageRequest};
use crate::domain::principal::Principal;
use crate::domain::user::UserId;
use crate::domain::DomainError;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};

use super::views::FollowStatsView;

#[derive(Debug, Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowRepository>,
    cache: ReadThroughCache,
    engine: InvalidationEngine,
}

impl FollowService {
    pub fn new(
        follows: Arc<dyn FollowRepository>,
        cache: ReadThroughCache,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            follows,
            cache,
            engine,
        }
    }

    /// Follow `followee`, or unfollow if already following
    pub async fn toggle(&self, actor: &Principal, followee: UserId) -> Result<FollowToggle, DomainError> {
        let toggle = self.follows.toggle(actor.user_id(), followee).await?;

        self.engine
            .invalidate(MutationEvent::new(MutationKind::FollowToggled {
                follower: actor.user_id(),
                followee,
            }))
            .await;

        Ok(toggle)
    }

    pub async fn stats(&self, user: UserId) -> Result<FollowStatsView, DomainError> {
        let key = build_key(CacheKind::FollowerCount, &KeyScope::of(user))?;

        self.cache
            .get_or_compute(&key, || async move {
                Ok(FollowStatsView::from(self.follows.counts(user).await?))
            })
            .await
    }

    pub async fn all(&self, page: PageRequest) -> Result<PageEnvelope<FollowStatsView>, DomainError> {
        let key = build_key(CacheKind::AllFollowers, &KeyScope::global().paged(page))?;

        self.cache
            .get_or_compute_page(
                &key,
                page,
                |page| self.follows.all_counts(page),
                |counts| async move { Ok(counts.into_iter().map(FollowStatsView::from).collect()) },
            )
            .await
    }
}
