//! Comment repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{Comment, CommentId, NewComment};
use crate::domain::ids::{PostId, UserId};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::DomainError;

/// Filter for comment listings
///
/// `public_posts_only` drops comments whose parent post is private; listings
/// that are not keyed by viewer set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentFilter {
    pub post: Option<PostId>,
    pub author: Option<UserId>,
    pub public_posts_only: bool,
}

impl CommentFilter {
    pub fn all_public() -> Self {
        Self {
            public_posts_only: true,
            ..Default::default()
        }
    }

    pub fn on_post(post: PostId) -> Self {
        Self {
            post: Some(post),
            ..Default::default()
        }
    }

    pub fn by_author(mut self, author: UserId) -> Self {
        self.author = Some(author);
        self
    }
}

#[async_trait]
pub trait CommentRepository: Send + Sync + Debug {
    async fn get(&self, id: CommentId) -> Result<Option<Comment>, DomainError>;

    /// Insert a comment; the parent post must exist
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError>;

    async fn update(&self, comment: &Comment) -> Result<Comment, DomainError>;

    /// Delete a comment together with its likes
    async fn delete(&self, id: CommentId) -> Result<bool, DomainError>;

    /// Newest first
    async fn list(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<Page<Comment>, DomainError>;

    /// All comments on a post, oldest first
    async fn for_post(&self, post: PostId) -> Result<Vec<Comment>, DomainError>;

    async fn count_for_post(&self, post: PostId) -> Result<usize, DomainError>;
}
