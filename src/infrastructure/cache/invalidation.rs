//! Invalidation fan-out engine
//!
//! Maps each committed mutation to the cache scopes it makes stale and
//! deletes them. Planning is pure; execution runs every target concurrently
//! and never fails, it reports what it could not delete instead.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::cache::{
    build_key, CacheKind, KeyScope, LikedEntity, MutationEvent, MutationKind, GLOBAL_IDENTITY,
};
use crate::infrastructure::observability::record_invalidation;

use super::index::{KeyIndex, PurgeFailure, PurgeOutcome};

/// One thing to drop from the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidationTarget {
    /// A single unpaged key, e.g. a post detail
    Exact { kind: CacheKind, identity: String },
    /// Every page of one scope at every page size; `identity` is `None`
    /// for global collections
    Scope {
        kind: CacheKind,
        identity: Option<String>,
    },
    /// Every live scope of a kind, or only those keyed on `identity`
    Kind {
        kind: CacheKind,
        identity: Option<String>,
    },
}

impl InvalidationTarget {
    fn exact(kind: CacheKind, identity: impl ToString) -> Self {
        Self::Exact {
            kind,
            identity: identity.to_string(),
        }
    }

    fn global(kind: CacheKind) -> Self {
        Self::Scope {
            kind,
            identity: None,
        }
    }

    fn scope(kind: CacheKind, identity: impl ToString) -> Self {
        Self::Scope {
            kind,
            identity: Some(identity.to_string()),
        }
    }

    fn every(kind: CacheKind) -> Self {
        Self::Kind {
            kind,
            identity: None,
        }
    }

    fn every_of(kind: CacheKind, identity: impl ToString) -> Self {
        Self::Kind {
            kind,
            identity: Some(identity.to_string()),
        }
    }
}

/// Deduplicated targets for one event, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    targets: Vec<InvalidationTarget>,
}

impl InvalidationPlan {
    fn push(&mut self, target: InvalidationTarget) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    fn extend(&mut self, targets: impl IntoIterator<Item = InvalidationTarget>) {
        for target in targets {
            self.push(target);
        }
    }

    pub fn targets(&self) -> &[InvalidationTarget] {
        &self.targets
    }

    pub fn contains(&self, target: &InvalidationTarget) -> bool {
        self.targets.contains(target)
    }

    /// Kinds touched by the plan
    pub fn kinds(&self) -> HashSet<CacheKind> {
        self.targets
            .iter()
            .map(|target| match target {
                InvalidationTarget::Exact { kind, .. }
                | InvalidationTarget::Scope { kind, .. }
                | InvalidationTarget::Kind { kind, .. } => *kind,
            })
            .collect()
    }
}

/// What an invalidation run did
#[derive(Debug, Clone)]
pub struct InvalidationReport {
    pub event_id: Uuid,
    pub event: &'static str,
    pub keys_purged: Vec<String>,
    pub failures: Vec<PurgeFailure>,
}

impl InvalidationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct InvalidationEngine {
    index: KeyIndex,
}

impl InvalidationEngine {
    pub fn new(index: KeyIndex) -> Self {
        Self { index }
    }

    /// Targets made stale by `event`
    pub fn plan(event: &MutationKind) -> InvalidationPlan {
        use CacheKind::*;
        use InvalidationTarget as T;

        let mut plan = InvalidationPlan::default();

        // every listing that embeds post payloads
        let post_lists = [T::every(Posts), T::every(UserPosts), T::every(Feed)];

        match event {
            MutationKind::PostCreated { post, .. } => {
                plan.push(T::exact(Post, post));
                plan.push(T::every(Posts));
                plan.push(T::every(UserPosts));
                plan.push(T::every(Feed));
            }
            MutationKind::PostUpdated { post, .. } => {
                plan.push(T::exact(Post, post));
                plan.push(T::every(Posts));
                plan.push(T::every(UserPosts));
                plan.push(T::every(Feed));
                // visibility changes move the post's comments in or out of public listings
                plan.push(T::global(Comments));
                plan.push(T::every(UserComments));
                plan.push(T::every_of(PostComments, post));
            }
            MutationKind::PostDeleted { post, comments, .. } => {
                plan.push(T::exact(Post, post));
                plan.push(T::every(Posts));
                plan.push(T::every(UserPosts));
                plan.push(T::every(Feed));
                plan.push(T::global(Comments));
                plan.push(T::every(UserComments));
                plan.push(T::every_of(PostComments, post));
                plan.extend(comments.iter().map(|comment| T::exact(Comment, comment)));
            }
            MutationKind::CommentCreated {
                comment,
                post,
                author,
            }
            | MutationKind::CommentUpdated {
                comment,
                post,
                author,
            }
            | MutationKind::CommentDeleted {
                comment,
                post,
                author,
            } => {
                plan.push(T::exact(Comment, comment));
                plan.push(T::global(Comments));
                plan.push(T::every_of(PostComments, post));
                plan.push(T::scope(UserComments, author));
                plan.push(T::exact(Post, post));
                plan.extend(post_lists);
            }
            MutationKind::LikeToggled { target, .. } => match target {
                LikedEntity::Post { post } => {
                    plan.push(T::exact(Post, post));
                    plan.extend(post_lists);
                }
                LikedEntity::Comment {
                    comment,
                    post,
                    author,
                } => {
                    plan.push(T::exact(Comment, comment));
                    plan.push(T::global(Comments));
                    plan.push(T::every_of(PostComments, post));
                    plan.push(T::scope(UserComments, author));
                    plan.push(T::exact(Post, post));
                    plan.extend(post_lists);
                }
            },
            MutationKind::FollowToggled { follower, followee } => {
                plan.push(T::exact(FollowerCount, followee));
                plan.push(T::exact(FollowerCount, follower));
                plan.push(T::scope(Feed, follower));
                plan.push(T::global(AllFollowers));
            }
            MutationKind::ProfilePhotoUpdated { user } => {
                plan.push(T::exact(ProfilePhoto, user));
                // user payloads carry the photo URL
                plan.push(T::exact(User, user));
                plan.push(T::global(Users));
            }
            MutationKind::UserCreated { .. } => {
                plan.push(T::global(Users));
                plan.push(T::global(AllFollowers));
            }
            MutationKind::UserUpdated { user } => {
                plan.push(T::exact(User, user));
                plan.push(T::global(Users));
            }
            MutationKind::UserDeleted { user } => {
                plan.push(T::exact(User, user));
                plan.push(T::global(Users));
                plan.push(T::global(AllFollowers));
                plan.push(T::every(FollowerCount));
                plan.push(T::exact(ProfilePhoto, user));
                // cascade: their posts, comments and likes are gone
                plan.push(T::every(Post));
                plan.extend(post_lists);
                plan.push(T::every(Comment));
                plan.push(T::global(Comments));
                plan.push(T::every(PostComments));
                plan.push(T::every(UserComments));
            }
        }

        plan
    }

    /// Purge everything `event` made stale
    ///
    /// Must only be called after the mutation is committed.
    pub async fn invalidate(&self, event: MutationEvent) -> InvalidationReport {
        let plan = Self::plan(&event.kind);
        let outcomes = join_all(plan.targets().iter().map(|target| self.execute(target))).await;

        let mut merged = PurgeOutcome::default();
        for outcome in outcomes {
            merged.merge(outcome);
        }

        let report = InvalidationReport {
            event_id: event.id,
            event: event.kind.name(),
            keys_purged: merged.purged,
            failures: merged.failures,
        };

        for failure in &report.failures {
            warn!(
                event_id = %report.event_id,
                event = report.event,
                key = %failure.key,
                error = %failure.error,
                "Cache invalidation failed for key"
            );
        }

        info!(
            event_id = %report.event_id,
            event = report.event,
            targets = plan.targets().len(),
            keys_purged = report.keys_purged.len(),
            failures = report.failures.len(),
            "Cache invalidated"
        );

        record_invalidation(report.event, report.keys_purged.len(), report.failures.len());

        report
    }

    async fn execute(&self, target: &InvalidationTarget) -> PurgeOutcome {
        match target {
            InvalidationTarget::Exact { kind, identity } => {
                match build_key(*kind, &KeyScope::of(identity)) {
                    Ok(key) => self.index.purge_key(&key).await,
                    Err(e) => Self::unresolvable(*kind, e),
                }
            }
            // the page size is part of each base, so a scope is found through the index
            InvalidationTarget::Scope { kind, identity } => {
                let identity = identity.as_deref().unwrap_or(GLOBAL_IDENTITY);
                self.purge_indexed(*kind, Some(identity)).await
            }
            InvalidationTarget::Kind { kind, identity } => {
                self.purge_indexed(*kind, identity.as_deref()).await
            }
        }
    }

    async fn purge_indexed(&self, kind: CacheKind, identity: Option<&str>) -> PurgeOutcome {
        let bases = match self.index.scopes(kind, identity).await {
            Ok(bases) => bases,
            Err(e) => return Self::unresolvable(kind, e),
        };

        let outcomes = join_all(bases.iter().map(|base| self.index.purge_scope(kind, base))).await;

        let mut merged = PurgeOutcome::default();
        for outcome in outcomes {
            merged.merge(outcome);
        }
        merged
    }

    fn unresolvable(kind: CacheKind, error: crate::domain::DomainError) -> PurgeOutcome {
        PurgeOutcome {
            purged: Vec::new(),
            failures: vec![PurgeFailure {
                key: format!("<{}>", kind),
                error: error.to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheExt, CacheKey, MockCache};
    use crate::domain::{CommentId, PageRequest, PostId, UserId};
    use std::sync::Arc;
    use std::time::Duration;

    use InvalidationTarget as T;

    const TTL: Duration = Duration::from_secs(300);

    fn post_event(post: u64, author: u64) -> MutationKind {
        MutationKind::PostUpdated {
            post: PostId::new(post),
            author: UserId::new(author),
        }
    }

    #[test]
    fn test_post_update_plan() {
        let plan = InvalidationEngine::plan(&post_event(5, 1));

        assert!(plan.contains(&T::exact(CacheKind::Post, 5)));
        assert!(plan.contains(&T::every(CacheKind::Posts)));
        assert!(plan.contains(&T::every(CacheKind::UserPosts)));
        assert!(plan.contains(&T::every(CacheKind::Feed)));
        assert!(plan.contains(&T::every_of(CacheKind::PostComments, 5)));
    }

    #[test]
    fn test_post_delete_plan_drops_cascaded_comments() {
        let plan = InvalidationEngine::plan(&MutationKind::PostDeleted {
            post: PostId::new(5),
            author: UserId::new(1),
            comments: vec![CommentId::new(8), CommentId::new(9)],
        });

        assert!(plan.contains(&T::exact(CacheKind::Comment, 8)));
        assert!(plan.contains(&T::exact(CacheKind::Comment, 9)));
        assert!(plan.contains(&T::global(CacheKind::Comments)));
    }

    #[test]
    fn test_comment_plan() {
        let plan = InvalidationEngine::plan(&MutationKind::CommentCreated {
            comment: CommentId::new(3),
            post: PostId::new(5),
            author: UserId::new(2),
        });

        assert!(plan.contains(&T::exact(CacheKind::Comment, 3)));
        assert!(plan.contains(&T::global(CacheKind::Comments)));
        assert!(plan.contains(&T::every_of(CacheKind::PostComments, 5)));
        assert!(plan.contains(&T::scope(CacheKind::UserComments, 2)));
        assert!(plan.contains(&T::exact(CacheKind::Post, 5)));
        assert!(plan.contains(&T::every(CacheKind::Posts)));
        assert!(plan.contains(&T::every(CacheKind::UserPosts)));
        assert!(plan.contains(&T::every(CacheKind::Feed)));
    }

    #[test]
    fn test_like_plans() {
        let on_post = InvalidationEngine::plan(&MutationKind::LikeToggled {
            user: UserId::new(1),
            target: LikedEntity::Post {
                post: PostId::new(5),
            },
        });
        assert!(on_post.contains(&T::exact(CacheKind::Post, 5)));
        assert!(on_post.contains(&T::every(CacheKind::Posts)));
        assert!(!on_post.kinds().contains(&CacheKind::Comments));

        let on_comment = InvalidationEngine::plan(&MutationKind::LikeToggled {
            user: UserId::new(1),
            target: LikedEntity::Comment {
                comment: CommentId::new(3),
                post: PostId::new(5),
                author: UserId::new(2),
            },
        });
        assert!(on_comment.contains(&T::exact(CacheKind::Post, 5)));
        assert!(on_comment.contains(&T::exact(CacheKind::Comment, 3)));
        assert!(on_comment.contains(&T::every(CacheKind::Posts)));
    }

    #[test]
    fn test_follow_plan() {
        let plan = InvalidationEngine::plan(&MutationKind::FollowToggled {
            follower: UserId::new(1),
            followee: UserId::new(2),
        });

        assert_eq!(
            plan.targets(),
            &[
                T::exact(CacheKind::FollowerCount, 2),
                T::exact(CacheKind::FollowerCount, 1),
                T::scope(CacheKind::Feed, 1),
                T::global(CacheKind::AllFollowers),
            ]
        );
    }

    #[test]
    fn test_user_plans() {
        let photo = InvalidationEngine::plan(&MutationKind::ProfilePhotoUpdated {
            user: UserId::new(4),
        });
        assert!(photo.contains(&T::exact(CacheKind::ProfilePhoto, 4)));

        let created = InvalidationEngine::plan(&MutationKind::UserCreated {
            user: UserId::new(4),
        });
        assert!(created.contains(&T::global(CacheKind::Users)));
        assert!(created.contains(&T::global(CacheKind::AllFollowers)));

        let updated = InvalidationEngine::plan(&MutationKind::UserUpdated {
            user: UserId::new(4),
        });
        assert_eq!(
            updated.targets(),
            &[T::exact(CacheKind::User, 4), T::global(CacheKind::Users)]
        );

        let deleted = InvalidationEngine::plan(&MutationKind::UserDeleted {
            user: UserId::new(4),
        });
        for kind in CacheKind::ALL {
            assert!(deleted.kinds().contains(&kind), "missing {}", kind);
        }
    }

    #[test]
    fn test_plan_is_deterministic_and_deduplicated() {
        let event = post_event(1, 1);
        let a = InvalidationEngine::plan(&event);
        let b = InvalidationEngine::plan(&event);

        assert_eq!(a, b);

        let unique: HashSet<_> = a.targets().iter().collect();
        assert_eq!(unique.len(), a.targets().len());
    }

    fn page(page: u32, size: u32) -> PageRequest {
        PageRequest::new(page, size).unwrap()
    }

    async fn populate(cache: &MockCache, index: &KeyIndex, kind: CacheKind, scope: KeyScope) -> CacheKey {
        let key = build_key(kind, &scope).unwrap();
        cache.set(key.as_str(), &"payload", TTL).await.unwrap();
        index.register(&key).await.unwrap();
        key
    }

    #[tokio::test]
    async fn test_invalidate_follow_purges_both_parties() {
        let cache = Arc::new(MockCache::new());
        let index = KeyIndex::new(cache.clone(), TTL);
        let engine = InvalidationEngine::new(index.clone());

        let a = UserId::new(1);
        let b = UserId::new(2);
        let c = UserId::new(3);

        let a_count = populate(&cache, &index, CacheKind::FollowerCount, KeyScope::of(a)).await;
        let b_count = populate(&cache, &index, CacheKind::FollowerCount, KeyScope::of(b)).await;
        let c_count = populate(&cache, &index, CacheKind::FollowerCount, KeyScope::of(c)).await;
        let a_feed_1 = populate(&cache, &index, CacheKind::Feed, KeyScope::of(a).paged(page(1, 10))).await;
        let a_feed_2 = populate(&cache, &index, CacheKind::Feed, KeyScope::of(a).paged(page(2, 10))).await;
        let c_feed = populate(&cache, &index, CacheKind::Feed, KeyScope::of(c).paged(page(1, 10))).await;
        let all = populate(&cache, &index, CacheKind::AllFollowers, KeyScope::global().paged(page(1, 10))).await;

        let report = engine
            .invalidate(MutationEvent::new(MutationKind::FollowToggled {
                follower: a,
                followee: b,
            }))
            .await;

        assert!(report.is_clean());
        assert_eq!(report.keys_purged.len(), 5);
        for key in [&a_count, &b_count, &a_feed_1, &a_feed_2, &all] {
            assert!(!cache.contains(key.as_str()), "{} survived", key);
        }
        assert!(cache.contains(c_count.as_str()));
        assert!(cache.contains(c_feed.as_str()));
    }

    #[tokio::test]
    async fn test_invalidate_scope_purges_every_page_size() {
        let cache = Arc::new(MockCache::new());
        let index = KeyIndex::new(cache.clone(), TTL);
        let engine = InvalidationEngine::new(index.clone());

        let a = UserId::new(1);
        let c = UserId::new(3);

        let mut stale = Vec::new();
        for size in [2, 10, 50] {
            stale.push(populate(&cache, &index, CacheKind::Feed, KeyScope::of(a).paged(page(1, size))).await);
            stale.push(
                populate(&cache, &index, CacheKind::AllFollowers, KeyScope::global().paged(page(1, size))).await,
            );
        }
        let untouched = populate(&cache, &index, CacheKind::Feed, KeyScope::of(c).paged(page(1, 2))).await;

        let report = engine
            .invalidate(MutationEvent::new(MutationKind::FollowToggled {
                follower: a,
                followee: UserId::new(2),
            }))
            .await;

        assert!(report.is_clean());
        for key in &stale {
            assert!(!cache.contains(key.as_str()), "{} survived", key);
        }
        assert!(cache.contains(untouched.as_str()));
    }

    #[tokio::test]
    async fn test_invalidate_post_purges_every_viewer_scope() {
        let cache = Arc::new(MockCache::new());
        let index = KeyIndex::new(cache.clone(), TTL);
        let engine = InvalidationEngine::new(index.clone());

        let detail = populate(&cache, &index, CacheKind::Post, KeyScope::of(9)).await;
        let mut lists = Vec::new();
        for viewer in 1..=3 {
            let viewer = UserId::new(viewer);
            for number in 1..=2 {
                let scope = KeyScope::global().viewer(viewer).paged(page(number, 10));
                lists.push(populate(&cache, &index, CacheKind::Posts, scope).await);
            }
            lists.push(populate(&cache, &index, CacheKind::Feed, KeyScope::of(viewer).paged(page(1, 10))).await);
        }
        let other_user_posts =
            populate(&cache, &index, CacheKind::UserPosts, KeyScope::of(2).viewer(UserId::new(1)).paged(page(1, 10))).await;
        let follower_count = populate(&cache, &index, CacheKind::FollowerCount, KeyScope::of(1)).await;

        let report = engine
            .invalidate(MutationEvent::new(post_event(9, 1)))
            .await;

        assert!(report.is_clean());
        assert!(!cache.contains(detail.as_str()));
        for key in &lists {
            assert!(!cache.contains(key.as_str()), "{} survived", key);
        }
        assert!(!cache.contains(other_user_posts.as_str()));
        assert!(cache.contains(follower_count.as_str()));
    }

    #[tokio::test]
    async fn test_invalidate_reports_store_failures() {
        let cache = Arc::new(MockCache::new());
        let index = KeyIndex::new(cache.clone(), TTL);
        let engine = InvalidationEngine::new(index.clone());

        populate(&cache, &index, CacheKind::User, KeyScope::of(1)).await;
        cache.set_error(Some("connection reset".to_string()));

        let report = engine
            .invalidate(MutationEvent::new(MutationKind::UserUpdated {
                user: UserId::new(1),
            }))
            .await;

        assert!(!report.is_clean());
        assert!(report.keys_purged.is_empty());
        assert_eq!(report.event, "user_updated");
    }
}
