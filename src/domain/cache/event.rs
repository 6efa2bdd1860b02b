//! Mutation events emitted after a change is committed to the source of record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ids::{CommentId, PostId, UserId};

/// The entity a like was added to or removed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LikedEntity {
    Post {
        post: PostId,
    },
    Comment {
        comment: CommentId,
        post: PostId,
        author: UserId,
    },
}

/// What changed, with every identity the fan-out rules need
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MutationKind {
    PostCreated {
        post: PostId,
        author: UserId,
    },
    PostUpdated {
        post: PostId,
        author: UserId,
    },
    /// `comments` lists the comments removed with the post
    PostDeleted {
        post: PostId,
        author: UserId,
        comments: Vec<CommentId>,
    },
    CommentCreated {
        comment: CommentId,
        post: PostId,
        author: UserId,
    },
    CommentUpdated {
        comment: CommentId,
        post: PostId,
        author: UserId,
    },
    CommentDeleted {
        comment: CommentId,
        post: PostId,
        author: UserId,
    },
    LikeToggled {
        user: UserId,
        target: LikedEntity,
    },
    FollowToggled {
        follower: UserId,
        followee: UserId,
    },
    ProfilePhotoUpdated {
        user: UserId,
    },
    UserCreated {
        user: UserId,
    },
    UserUpdated {
        user: UserId,
    },
    UserDeleted {
        user: UserId,
    },
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostCreated { .. } => "post_created",
            Self::PostUpdated { .. } => "post_updated",
            Self::PostDeleted { .. } => "post_deleted",
            Self::CommentCreated { .. } => "comment_created",
            Self::CommentUpdated { .. } => "comment_updated",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::LikeToggled { .. } => "like_toggled",
            Self::FollowToggled { .. } => "follow_toggled",
            Self::ProfilePhotoUpdated { .. } => "profile_photo_updated",
            Self::UserCreated { .. } => "user_created",
            Self::UserUpdated { .. } => "user_updated",
            Self::UserDeleted { .. } => "user_deleted",
        }
    }
}

/// A committed mutation, identified for log correlation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationEvent {
    pub id: Uuid,
    pub kind: MutationKind,
    pub occurred_at: DateTime<Utc>,
}

impl MutationEvent {
    pub fn new(kind: MutationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            occurred_at: Utc::now(),
        }
    }
}

impl From<MutationKind> for MutationEvent {
    fn from(kind: MutationKind) -> Self {
        Self::new(kind)
    }
}
