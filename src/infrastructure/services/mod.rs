//! Application services
//!
//! Each service checks permissions, commits to the source of record and only
//! then hands a mutation event to the invalidation engine. Reads go through
//! the read-through cache and return final payload views.

mod comment;
mod follow;
mod like;
mod post;
mod profile_photo;
mod user;
mod views;

use std::sync::Arc;
use std::time::Duration;

use crate::domain::cache::Cache;
use crate::domain::comment::CommentRepository;
use crate::domain::engagement::{FollowRepository, LikeRepository};
use crate::domain::post::PostRepository;
use crate::domain::user::UserRepository;
use crate::infrastructure::auth::PasswordHasher;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};
use crate::infrastructure::storage::InMemorySocialStore;

pub use comment::CommentService;
pub use follow::FollowService;
pub use like::LikeService;
pub use post::{CreatePostRequest, PostService, UpdatePostRequest};
pub use profile_photo::ProfilePhotoService;
pub use user::{CreateUserRequest, UpdateUserRequest, UserService};
pub use views::{
    CommentView, FollowStatsView, PostView, ProfilePhotoView, UserView, ViewBuilder,
};

/// Source-of-record handles
#[derive(Debug, Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemorySocialStore::new());

        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            likes: store.clone(),
            follows: store,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SocialServices {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub likes: LikeService,
    pub follows: FollowService,
    pub photos: ProfilePhotoService,
}

impl SocialServices {
    pub fn new(
        repositories: Repositories,
        store: Arc<dyn Cache>,
        ttl: Duration,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let cache = ReadThroughCache::new(store, ttl);
        let engine = InvalidationEngine::new(cache.index().clone());
        let views = ViewBuilder::new(repositories.comments.clone(), repositories.likes.clone());

        let users = UserService::new(
            repositories.users.clone(),
            hasher,
            cache.clone(),
            engine.clone(),
        );
        let posts = PostService::new(
            repositories.posts.clone(),
            repositories.comments.clone(),
            repositories.users.clone(),
            views.clone(),
            cache.clone(),
            engine.clone(),
        );
        let comments = CommentService::new(
            repositories.comments.clone(),
            repositories.users.clone(),
            posts.clone(),
            views,
            cache.clone(),
            engine.clone(),
        );
        let likes = LikeService::new(
            repositories.likes.clone(),
            posts.clone(),
            comments.clone(),
            engine.clone(),
        );
        let follows = FollowService::new(repositories.follows.clone(), cache.clone(), engine.clone());
        let photos = ProfilePhotoService::new(repositories.users, cache, engine);

        Self {
            users,
            posts,
            comments,
            likes,
            follows,
            photos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::pagination::{Page, PageRequest};
    use crate::domain::post::{NewPost, Post, PostId, PostScope, Visibility};
    use crate::domain::principal::Principal;
    use crate::domain::user::UserId;
    use crate::domain::DomainError;
    use crate::infrastructure::auth::Argon2Hasher;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    /// Post store whose reads fail once `down` is set
    #[derive(Debug)]
    struct FlakyPosts {
        inner: Arc<dyn PostRepository>,
        down: AtomicBool,
    }

    #[async_trait]
    impl PostRepository for FlakyPosts {
        async fn get(&self, id: PostId) -> Result<Option<Post>, DomainError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(DomainError::storage("post store unavailable"));
            }
            self.inner.get(id).await
        }

        async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
            self.inner.create(post).await
        }

        async fn update(&self, post: &Post) -> Result<Post, DomainError> {
            self.inner.update(post).await
        }

        async fn delete(&self, id: PostId) -> Result<bool, DomainError> {
            self.inner.delete(id).await
        }

        async fn list(
            &self,
            scope: PostScope,
            viewer: &Principal,
            page: PageRequest,
        ) -> Result<Page<Post>, DomainError> {
            self.inner.list(scope, viewer, page).await
        }
    }

    fn services(cache: Arc<MockCache>) -> SocialServices {
        SocialServices::new(Repositories::in_memory(), cache, TTL, Arc::new(Argon2Hasher::new()))
    }

    async fn user(services: &SocialServices, name: &str) -> Principal {
        let user = services
            .users
            .register(CreateUserRequest {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password: "password123".to_string(),
                is_staff: false,
            })
            .await
            .unwrap();
        Principal::new(user.id(), false)
    }

    fn post_request(title: &str, visibility: Visibility) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            content: "content".to_string(),
            visibility: Some(visibility),
            ..Default::default()
        }
    }

    fn first_page() -> PageRequest {
        PageRequest::default()
    }

    #[tokio::test]
    async fn test_post_update_invalidates_detail_and_lists() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;

        let post = services
            .posts
            .create(&alice, post_request("First", Visibility::Public))
            .await
            .unwrap();

        services.posts.list(&alice, first_page()).await.unwrap();
        services.posts.get(&alice, post.id).await.unwrap();
        services.posts.feed(&alice, first_page()).await.unwrap();

        let detail_key = format!("v1:post:{}", post.id);
        let list_key = format!("v1:posts:all:size=10:viewer={}:page=1", alice.user_id());
        let feed_key = format!("v1:feed:{}:size=10:page=1", alice.user_id());
        assert!(cache.contains(&detail_key));
        assert!(cache.contains(&list_key));
        assert!(cache.contains(&feed_key));

        services
            .posts
            .update(
                &alice,
                post.id,
                UpdatePostRequest {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(!cache.contains(&detail_key));
        assert!(!cache.contains(&list_key));
        assert!(!cache.contains(&feed_key));

        let listed = services.posts.list(&alice, first_page()).await.unwrap();
        assert_eq!(listed.results[0].title, "Renamed");
        assert_eq!(services.posts.get(&alice, post.id).await.unwrap().title, "Renamed");
    }

    #[tokio::test]
    async fn test_page_size_is_part_of_the_cached_page() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        for name in ["alice", "bob", "carol"] {
            user(&services, name).await;
        }

        let small = PageRequest::first(2).unwrap();
        let large = PageRequest::first(50).unwrap();

        assert_eq!(services.users.list(small).await.unwrap().results.len(), 2);
        assert_eq!(services.users.list(large).await.unwrap().results.len(), 3);

        // both sizes now warm, neither may answer for the other
        let small_page = services.users.list(small).await.unwrap();
        let large_page = services.users.list(large).await.unwrap();
        assert_eq!(small_page.results.len(), 2);
        assert_eq!(small_page.next, Some(2));
        assert_eq!(large_page.results.len(), 3);
        assert_eq!(large_page.next, None);

        user(&services, "dave").await;

        assert!(cache.keys().iter().all(|k| !k.starts_with("v1:users:")));
        assert_eq!(services.users.list(large).await.unwrap().count, 4);
    }

    #[tokio::test]
    async fn test_comment_invalidates_parent_post_and_comment_lists() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        let post = services
            .posts
            .create(&alice, post_request("Hello", Visibility::Public))
            .await
            .unwrap();

        services.posts.get(&bob, post.id).await.unwrap();
        services.posts.list(&bob, first_page()).await.unwrap();
        services.posts.list(&alice, first_page()).await.unwrap();
        services.comments.list(first_page()).await.unwrap();

        services
            .comments
            .create(&bob, post.id, "Nice post".to_string())
            .await
            .unwrap();

        assert!(cache.keys().iter().all(|k| !k.starts_with("v1:post:")));
        assert!(cache.keys().iter().all(|k| !k.starts_with("v1:posts:")));
        assert!(!cache.contains("v1:comments:all:size=10:page=1"));

        let detail = services.posts.get(&bob, post.id).await.unwrap();
        assert_eq!(detail.comment_count, 1);
        assert_eq!(services.comments.list(first_page()).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_like_refreshes_counts() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        let post = services
            .posts
            .create(&alice, post_request("Hello", Visibility::Public))
            .await
            .unwrap();
        let comment = services
            .comments
            .create(&alice, post.id, "first".to_string())
            .await
            .unwrap();

        assert_eq!(services.posts.get(&bob, post.id).await.unwrap().like_count, 0);
        assert_eq!(services.comments.get(&bob, comment.id).await.unwrap().like_count, 0);

        assert!(services.likes.toggle_post(&bob, post.id).await.unwrap().liked);
        assert!(services.likes.toggle_comment(&bob, comment.id).await.unwrap().liked);

        let detail = services.posts.get(&bob, post.id).await.unwrap();
        assert_eq!(detail.like_count, 1);
        assert_eq!(detail.comments[0].like_count, 1);
        assert_eq!(services.comments.get(&bob, comment.id).await.unwrap().like_count, 1);
    }

    #[tokio::test]
    async fn test_follow_and_unfollow_purge_the_same_keys() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;
        let (a, b) = (alice.user_id(), bob.user_id());

        let keys = [
            format!("v1:follower_count:{}", a),
            format!("v1:follower_count:{}", b),
            format!("v1:feed:{}:size=10:page=1", a),
            "v1:all_followers:all:size=10:page=1".to_string(),
        ];

        for following in [true, false] {
            services.follows.stats(a).await.unwrap();
            services.follows.stats(b).await.unwrap();
            services.posts.feed(&alice, first_page()).await.unwrap();
            services.follows.all(first_page()).await.unwrap();
            for key in &keys {
                assert!(cache.contains(key), "{} not populated", key);
            }

            let toggle = services.follows.toggle(&alice, b).await.unwrap();
            assert_eq!(toggle.following, following);

            for key in &keys {
                assert!(!cache.contains(key), "{} survived", key);
            }
        }

        assert_eq!(services.follows.stats(b).await.unwrap().followers_count, 0);
    }

    #[tokio::test]
    async fn test_feed_follows_new_posts() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        services.follows.toggle(&alice, bob.user_id()).await.unwrap();
        assert_eq!(services.posts.feed(&alice, first_page()).await.unwrap().count, 0);

        services
            .posts
            .create(&bob, post_request("From bob", Visibility::Public))
            .await
            .unwrap();

        let feed = services.posts.feed(&alice, first_page()).await.unwrap();
        assert_eq!(feed.count, 1);
        assert_eq!(feed.results[0].title, "From bob");
    }

    #[tokio::test]
    async fn test_viewers_never_share_cached_lists() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        services
            .posts
            .create(&alice, post_request("Secret", Visibility::Private))
            .await
            .unwrap();
        services
            .posts
            .create(&alice, post_request("Open", Visibility::Public))
            .await
            .unwrap();

        let (as_alice, as_bob) = tokio::join!(
            services.posts.list(&alice, first_page()),
            services.posts.list(&bob, first_page())
        );
        assert_eq!(as_alice.unwrap().count, 2);
        assert_eq!(as_bob.unwrap().count, 1);

        // repeat against the now warm cache
        let as_bob = services.posts.list(&bob, first_page()).await.unwrap();
        assert!(as_bob.results.iter().all(|p| p.title != "Secret"));

        let (feed_a, feed_b) = tokio::join!(
            services.posts.feed(&alice, first_page()),
            services.posts.feed(&bob, first_page())
        );
        assert_eq!(feed_a.unwrap().count, 2);
        assert_eq!(feed_b.unwrap().count, 0);
    }

    #[tokio::test]
    async fn test_cached_private_post_stays_hidden() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        let post = services
            .posts
            .create(&alice, post_request("Secret", Visibility::Private))
            .await
            .unwrap();

        services.posts.get(&alice, post.id).await.unwrap();
        assert!(cache.contains(&format!("v1:post:{}", post.id)));

        let result = services.posts.get(&bob, post.id).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));

        let comment = services.comments.create(&bob, post.id, "hi".to_string()).await;
        assert!(matches!(comment, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_source_of_record() {
        let cache = Arc::new(MockCache::new().with_error("connection refused"));
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;

        let post = services
            .posts
            .create(&alice, post_request("Hello", Visibility::Public))
            .await
            .unwrap();
        services
            .posts
            .update(
                &alice,
                post.id,
                UpdatePostRequest {
                    content: Some("edited".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let detail = services.posts.get(&alice, post.id).await.unwrap();
        assert_eq!(detail.content, "edited");
        assert_eq!(services.posts.list(&alice, first_page()).await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_permissions() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let bob = user(&services, "bob").await;

        let post = services
            .posts
            .create(&alice, post_request("Mine", Visibility::Public))
            .await
            .unwrap();

        let result = services.posts.delete(&bob, post.id).await;
        assert!(matches!(result, Err(DomainError::PermissionDenied { .. })));

        let staff = Principal::new(bob.user_id(), true);
        services.posts.delete(&staff, post.id).await.unwrap();

        let result = services
            .users
            .create(
                &alice,
                CreateUserRequest {
                    username: "carol".to_string(),
                    email: "carol@example.com".to_string(),
                    password: "password123".to_string(),
                    is_staff: false,
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_profile_photo_update_refreshes_user_payloads() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;
        let id: UserId = alice.user_id();

        assert_eq!(services.photos.get(id).await.unwrap().profile_photo, None);
        services.users.get(id).await.unwrap();

        services
            .photos
            .update(&alice, id, Some("https://cdn.example.com/alice.png".to_string()))
            .await
            .unwrap();

        let url = Some("https://cdn.example.com/alice.png".to_string());
        assert_eq!(services.photos.get(id).await.unwrap().profile_photo, url);
        assert_eq!(services.users.get(id).await.unwrap().profile_photo, url);

        let invalid = services.photos.update(&alice, id, Some("not a url".to_string())).await;
        assert!(matches!(invalid, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_comment_read_surfaces_post_store_failures() {
        let mut repositories = Repositories::in_memory();
        let posts = Arc::new(FlakyPosts {
            inner: repositories.posts.clone(),
            down: AtomicBool::new(false),
        });
        repositories.posts = posts.clone() as Arc<dyn PostRepository>;
        let services = SocialServices::new(
            repositories,
            Arc::new(MockCache::new()),
            TTL,
            Arc::new(Argon2Hasher::new()),
        );
        let alice = user(&services, "alice").await;

        let post = services
            .posts
            .create(&alice, post_request("Hello", Visibility::Public))
            .await
            .unwrap();
        let comment = services
            .comments
            .create(&alice, post.id, "first".to_string())
            .await
            .unwrap();

        posts.down.store(true, Ordering::SeqCst);
        let result = services.comments.get(&alice, comment.id).await;
        assert!(matches!(result, Err(DomainError::Storage { .. })), "{:?}", result);

        // a hidden parent post still reads as a missing comment
        posts.down.store(false, Ordering::SeqCst);
        let bob = user(&services, "bob").await;
        let secret = services
            .posts
            .create(&alice, post_request("Secret", Visibility::Private))
            .await
            .unwrap();
        let hidden = services
            .comments
            .create(&alice, secret.id, "shh".to_string())
            .await
            .unwrap();
        let result = services.comments.get(&bob, hidden.id).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_post_delete_drops_cached_comments() {
        let cache = Arc::new(MockCache::new());
        let services = services(cache.clone());
        let alice = user(&services, "alice").await;

        let post = services
            .posts
            .create(&alice, post_request("Doomed", Visibility::Public))
            .await
            .unwrap();
        let comment = services
            .comments
            .create(&alice, post.id, "bye".to_string())
            .await
            .unwrap();
        services.comments.get(&alice, comment.id).await.unwrap();
        services
            .comments
            .post_comments(&alice, post.id, None, first_page())
            .await
            .unwrap();

        services.posts.delete(&alice, post.id).await.unwrap();

        assert!(cache.keys().iter().all(|k| !k.starts_with("v1:comment:")));
        assert!(cache.keys().iter().all(|k| !k.starts_with("v1:post_comments:")));
        let result = services.comments.get(&alice, comment.id).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
