//! Posts: create, update, delete and the cached post listings

use std::sync::Arc;

use tracing::info;

use crate::domain::cache::{build_key, CacheKind, KeyScope, MutationEvent, MutationKind};
use crate::domain::comment::CommentRepository;
use crate::domain::pagination::{PageEnvelope, PageRequest};
use crate::domain::post::{
    validate_metadata, validate_title, Post, PostDraft, PostFactory, PostId, PostRepository,
    PostScope, Visibility,
};
use crate::domain::principal::Principal;
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};

use super::views::{PostView, ViewBuilder};

#[derive(Debug, Clone, Default)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub post_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    views: ViewBuilder,
    cache: ReadThroughCache,
    engine: InvalidationEngine,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
        views: ViewBuilder,
        cache: ReadThroughCache,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
            views,
            cache,
            engine,
        }
    }

    /// Post detail; private posts of other users read as not found
    pub async fn get(&self, viewer: &Principal, id: PostId) -> Result<PostView, DomainError> {
        let key = build_key(CacheKind::Post, &KeyScope::of(id))?;

        let view: PostView = self
            .cache
            .get_or_compute(&key, || async move {
                let post = self.require(id).await?;
                self.views.post(&post).await
            })
            .await?;

        if !viewer.can_view(view.visibility, view.author) {
            return Err(not_found(id));
        }

        Ok(view)
    }

    /// Every post the viewer may see
    pub async fn list(
        &self,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<PageEnvelope<PostView>, DomainError> {
        let scope = KeyScope::global().viewer(viewer.user_id()).paged(page);
        self.list_scope(CacheKind::Posts, scope, PostScope::All, viewer, page)
            .await
    }

    /// Posts written by `owner` that the viewer may see
    pub async fn user_posts(
        &self,
        viewer: &Principal,
        owner: UserId,
        page: PageRequest,
    ) -> Result<PageEnvelope<PostView>, DomainError> {
        if !self.users.exists(owner).await? {
            return Err(DomainError::not_found(format!("User {} not found", owner)));
        }

        let scope = KeyScope::of(owner).viewer(viewer.user_id()).paged(page);
        self.list_scope(CacheKind::UserPosts, scope, PostScope::Author(owner), viewer, page)
            .await
    }

    /// The viewer's own posts and those of the users they follow
    pub async fn feed(
        &self,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<PageEnvelope<PostView>, DomainError> {
        let scope = KeyScope::of(viewer.user_id()).paged(page);
        self.list_scope(
            CacheKind::Feed,
            scope,
            PostScope::FeedOf(viewer.user_id()),
            viewer,
            page,
        )
        .await
    }

    async fn list_scope(
        &self,
        kind: CacheKind,
        scope: KeyScope,
        posts: PostScope,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<PageEnvelope<PostView>, DomainError> {
        let key = build_key(kind, &scope)?;

        self.cache
            .get_or_compute_page(
                &key,
                page,
                |page| self.posts.list(posts, viewer, page),
                |items| async move { self.views.posts(&items).await },
            )
            .await
    }

    pub async fn create(
        &self,
        actor: &Principal,
        request: CreatePostRequest,
    ) -> Result<PostView, DomainError> {
        let new_post = PostFactory::create(PostDraft {
            title: request.title,
            content: request.content,
            post_type: request.post_type,
            metadata: request.metadata,
            author: Some(actor.user_id()),
            visibility: request.visibility,
        })?;

        let post = self.posts.create(new_post).await?;
        info!(post_id = %post.id(), author = %post.author(), "Post created");

        self.engine
            .invalidate(MutationEvent::new(MutationKind::PostCreated {
                post: post.id(),
                author: post.author(),
            }))
            .await;

        self.views.post(&post).await
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: PostId,
        request: UpdatePostRequest,
    ) -> Result<PostView, DomainError> {
        let mut post = self.require_visible(actor, id).await?;
        actor.require_owner_or_staff(post.author(), "post")?;

        if let Some(title) = request.title {
            validate_title(&title)?;
            post.set_title(title.trim());
        }
        if let Some(content) = request.content {
            post.set_content(content);
        }
        if let Some(metadata) = request.metadata {
            validate_metadata(post.post_type(), Some(&metadata))?;
            post.set_metadata(metadata);
        }
        if let Some(visibility) = request.visibility {
            post.set_visibility(visibility);
        }

        let post = self.posts.update(&post).await?;
        self.engine
            .invalidate(MutationEvent::new(MutationKind::PostUpdated {
                post: post.id(),
                author: post.author(),
            }))
            .await;

        self.views.post(&post).await
    }

    pub async fn delete(&self, actor: &Principal, id: PostId) -> Result<(), DomainError> {
        let post = self.require_visible(actor, id).await?;
        actor.require_owner_or_staff(post.author(), "post")?;

        let comments: Vec<_> = self
            .comments
            .for_post(id)
            .await?
            .iter()
            .map(|c| c.id())
            .collect();

        if !self.posts.delete(id).await? {
            return Err(not_found(id));
        }

        info!(post_id = %id, "Post deleted");
        self.engine
            .invalidate(MutationEvent::new(MutationKind::PostDeleted {
                post: id,
                author: post.author(),
                comments,
            }))
            .await;

        Ok(())
    }

    /// Live post the actor is allowed to see
    pub(super) async fn require_visible(
        &self,
        actor: &Principal,
        id: PostId,
    ) -> Result<Post, DomainError> {
        let post = self.require(id).await?;

        if !actor.can_view(post.visibility(), post.author()) {
            return Err(not_found(id));
        }

        Ok(post)
    }

    async fn require(&self, id: PostId) -> Result<Post, DomainError> {
        self.posts.get(id).await?.ok_or_else(|| not_found(id))
    }
}

fn not_found(id: PostId) -> DomainError {
    DomainError::not_found(format!("Post {} not found", id))
}
