//! Comments: create, edit, delete and the cached comment listings

use std::sync::Arc;

use tracing::info;

use crate::domain::cache::{build_key, CacheKind, KeyScope, MutationEvent, MutationKind};
use crate::domain::comment::{Comment, CommentFilter, CommentId, CommentRepository, NewComment};
use crate::domain::pagination::{PageEnvelope, PageRequest};
use crate::domain::post::PostId;
use crate::domain::principal::Principal;
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};

use super::post::PostService;
use super::views::{CommentView, ViewBuilder};

#[derive(Debug, Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
    posts: PostService,
    views: ViewBuilder,
    cache: ReadThroughCache,
    engine: InvalidationEngine,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
        posts: PostService,
        views: ViewBuilder,
        cache: ReadThroughCache,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            comments,
            users,
            posts,
            views,
            cache,
            engine,
        }
    }

    /// Comment detail; comments on posts the viewer cannot see read as not found
    pub async fn get(&self, viewer: &Principal, id: CommentId) -> Result<CommentView, DomainError> {
        let key = build_key(CacheKind::Comment, &KeyScope::of(id))?;

        let view: CommentView = self
            .cache
            .get_or_compute(&key, || async move {
                let comment = self.require(id).await?;
                self.views.comment(&comment).await
            })
            .await?;

        match self.posts.get(viewer, view.post).await {
            Ok(_) => Ok(view),
            Err(DomainError::NotFound { .. }) => Err(not_found(id)),
            Err(e) => Err(e),
        }
    }

    /// A comment addressed through its parent post
    pub async fn get_on_post(
        &self,
        viewer: &Principal,
        post: PostId,
        id: CommentId,
    ) -> Result<CommentView, DomainError> {
        let view = self.get(viewer, id).await?;

        if view.post != post {
            return Err(not_found(id));
        }

        Ok(view)
    }

    /// Comments on public posts
    pub async fn list(&self, page: PageRequest) -> Result<PageEnvelope<CommentView>, DomainError> {
        let key = build_key(CacheKind::Comments, &KeyScope::global().paged(page))?;
        self.list_filtered(&key, CommentFilter::all_public(), page).await
    }

    /// Comments on one post, optionally only those by `author`
    pub async fn post_comments(
        &self,
        viewer: &Principal,
        post: PostId,
        author: Option<UserId>,
        page: PageRequest,
    ) -> Result<PageEnvelope<CommentView>, DomainError> {
        self.posts.get(viewer, post).await?;

        let mut scope = KeyScope::of(post);
        let mut filter = CommentFilter::on_post(post);
        if let Some(author) = author {
            scope = scope.with_qualifier("author", author);
            filter = filter.by_author(author);
        }

        let key = build_key(CacheKind::PostComments, &scope.paged(page))?;
        self.list_filtered(&key, filter, page).await
    }

    /// Comments written by `user` on public posts
    pub async fn user_comments(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> Result<PageEnvelope<CommentView>, DomainError> {
        if !self.users.exists(user).await? {
            return Err(DomainError::not_found(format!("User {} not found", user)));
        }

        let key = build_key(CacheKind::UserComments, &KeyScope::of(user).paged(page))?;
        self.list_filtered(&key, CommentFilter::all_public().by_author(user), page)
            .await
    }

    async fn list_filtered(
        &self,
        key: &crate::domain::cache::CacheKey,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<PageEnvelope<CommentView>, DomainError> {
        self.cache
            .get_or_compute_page(
                key,
                page,
                |page| self.comments.list(filter, page),
                |items| async move { self.views.comments(&items).await },
            )
            .await
    }

    pub async fn create(
        &self,
        actor: &Principal,
        post: PostId,
        text: String,
    ) -> Result<CommentView, DomainError> {
        self.posts.require_visible(actor, post).await?;

        let comment = self
            .comments
            .create(NewComment::new(text, actor.user_id(), post)?)
            .await?;
        info!(comment_id = %comment.id(), post_id = %post, "Comment created");

        self.engine
            .invalidate(MutationEvent::new(MutationKind::CommentCreated {
                comment: comment.id(),
                post,
                author: comment.author(),
            }))
            .await;

        self.views.comment(&comment).await
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: CommentId,
        text: String,
    ) -> Result<CommentView, DomainError> {
        let mut comment = self.require(id).await?;
        actor.require_owner_or_staff(comment.author(), "comment")?;

        comment.set_text(text)?;
        let comment = self.comments.update(&comment).await?;

        self.engine
            .invalidate(MutationEvent::new(MutationKind::CommentUpdated {
                comment: id,
                post: comment.post(),
                author: comment.author(),
            }))
            .await;

        self.views.comment(&comment).await
    }

    pub async fn delete(&self, actor: &Principal, id: CommentId) -> Result<(), DomainError> {
        let comment = self.require(id).await?;
        actor.require_owner_or_staff(comment.author(), "comment")?;

        if !self.comments.delete(id).await? {
            return Err(not_found(id));
        }

        info!(comment_id = %id, "Comment deleted");
        self.engine
            .invalidate(MutationEvent::new(MutationKind::CommentDeleted {
                comment: id,
                post: comment.post(),
                author: comment.author(),
            }))
            .await;

        Ok(())
    }

    pub(super) async fn require(&self, id: CommentId) -> Result<Comment, DomainError> {
        self.comments.get(id).await?.ok_or_else(|| not_found(id))
    }
}

fn not_found(id: CommentId) -> DomainError {
    DomainError::not_found(format!("Comment {} not found", id))
}
