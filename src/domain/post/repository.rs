//! Post repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewPost, Post, PostId};
use crate::domain::ids::UserId;
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::principal::Principal;
use crate::domain::DomainError;

/// Which authors a post listing draws from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostScope {
    All,
    Author(UserId),
    /// Feed of a viewer: the viewer's own posts and those of everyone they follow
    FeedOf(UserId),
}

#[async_trait]
pub trait PostRepository: Send + Sync + Debug {
    async fn get(&self, id: PostId) -> Result<Option<Post>, DomainError>;

    async fn create(&self, post: NewPost) -> Result<Post, DomainError>;

    async fn update(&self, post: &Post) -> Result<Post, DomainError>;

    /// Delete a post together with its comments and likes
    async fn delete(&self, id: PostId) -> Result<bool, DomainError>;

    /// Posts in `scope` the viewer may see, newest first
    async fn list(
        &self,
        scope: PostScope,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<Page<Post>, DomainError>;
}
