//! Externally serializable payloads
//!
//! These are what the cache stores and what handlers return. Aggregate
//! fields are computed from the source of record when a view is built.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::domain::comment::{Comment, CommentId, CommentRepository};
use crate::domain::engagement::{FollowCounts, LikeRepository, LikeTarget};
use crate::domain::post::{Post, PostId, PostType, Visibility};
use crate::domain::user::{User, UserId};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub profile_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            is_staff: user.is_staff(),
            profile_photo: user.profile_photo().map(str::to_string),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub text: String,
    pub author: UserId,
    pub post: PostId,
    pub like_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    pub metadata: serde_json::Value,
    pub author: UserId,
    pub visibility: Visibility,
    pub like_count: usize,
    pub comment_count: usize,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStatsView {
    pub user: UserId,
    pub followers_count: usize,
    pub following_count: usize,
}

impl From<FollowCounts> for FollowStatsView {
    fn from(counts: FollowCounts) -> Self {
        Self {
            user: counts.user,
            followers_count: counts.followers,
            following_count: counts.following,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePhotoView {
    pub user: UserId,
    pub profile_photo: Option<String>,
}

impl From<&User> for ProfilePhotoView {
    fn from(user: &User) -> Self {
        Self {
            user: user.id(),
            profile_photo: user.profile_photo().map(str::to_string),
        }
    }
}

/// Builds views with their aggregate fields
#[derive(Debug, Clone)]
pub struct ViewBuilder {
    comments: Arc<dyn CommentRepository>,
    likes: Arc<dyn LikeRepository>,
}

impl ViewBuilder {
    pub fn new(comments: Arc<dyn CommentRepository>, likes: Arc<dyn LikeRepository>) -> Self {
        Self { comments, likes }
    }

    pub async fn comment(&self, comment: &Comment) -> Result<CommentView, DomainError> {
        let like_count = self.likes.count(LikeTarget::Comment(comment.id())).await?;

        Ok(CommentView {
            id: comment.id(),
            text: comment.text().to_string(),
            author: comment.author(),
            post: comment.post(),
            like_count,
            created_at: comment.created_at(),
            updated_at: comment.updated_at(),
        })
    }

    pub async fn comments(&self, comments: &[Comment]) -> Result<Vec<CommentView>, DomainError> {
        try_join_all(comments.iter().map(|c| self.comment(c))).await
    }

    pub async fn post(&self, post: &Post) -> Result<PostView, DomainError> {
        let like_count = self.likes.count(LikeTarget::Post(post.id())).await?;
        let comments = self.comments.for_post(post.id()).await?;
        let comments = self.comments(&comments).await?;

        Ok(PostView {
            id: post.id(),
            title: post.title().to_string(),
            content: post.content().to_string(),
            post_type: post.post_type(),
            metadata: post.metadata().clone(),
            author: post.author(),
            visibility: post.visibility(),
            like_count,
            comment_count: comments.len(),
            comments,
            created_at: post.created_at(),
            updated_at: post.updated_at(),
        })
    }

    pub async fn posts(&self, posts: &[Post]) -> Result<Vec<PostView>, DomainError> {
        try_join_all(posts.iter().map(|p| self.post(p))).await
    }
}
