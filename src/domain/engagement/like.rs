//! Likes on posts and comments

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::ids::{CommentId, PostId, UserId};
use crate::domain::DomainError;

/// What a like points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: usize,
}

#[async_trait]
pub trait LikeRepository: Send + Sync + Debug {
    /// Add the like if absent, remove it if present
    async fn toggle(&self, user: UserId, target: LikeTarget) -> Result<LikeToggle, DomainError>;

    async fn count(&self, target: LikeTarget) -> Result<usize, DomainError>;
}
