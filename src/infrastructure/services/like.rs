//! Like toggling on posts and comments

use std::sync::Arc;

use crate::domain::cache::{LikedEntity, MutationEvent, MutationKind};
use crate::domain::comment::CommentId;
use crate::domain::engagement::{LikeRepository, LikeTarget, LikeToggle};
use crate::domain::post::PostId;
use crate::domain::principal::Principal;
use crate::domain::DomainError;
use crate::infrastructure::cache::InvalidationEngine;

use super::comment::CommentService;
use super::post::PostService;

#[derive(Debug, Clone)]
pub struct LikeService {
    likes: Arc<dyn LikeRepository>,
    posts: PostService,
    comments: CommentService,
    engine: InvalidationEngine,
}

impl LikeService {
    pub fn new(
        likes: Arc<dyn LikeRepository>,
        posts: PostService,
        comments: CommentService,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            likes,
            posts,
            comments,
            engine,
        }
    }

    pub async fn toggle_post(&self, actor: &Principal, post: PostId) -> Result<LikeToggle, DomainError> {
        self.posts.require_visible(actor, post).await?;

        let toggle = self.likes.toggle(actor.user_id(), LikeTarget::Post(post)).await?;
        self.engine
            .invalidate(MutationEvent::new(MutationKind::LikeToggled {
                user: actor.user_id(),
                target: LikedEntity::Post { post },
            }))
            .await;

        Ok(toggle)
    }

    pub async fn toggle_comment(
        &self,
        actor: &Principal,
        comment: CommentId,
    ) -> Result<LikeToggle, DomainError> {
        let liked = self.comments.require(comment).await?;
        self.posts.require_visible(actor, liked.post()).await?;

        let toggle = self
            .likes
            .toggle(actor.user_id(), LikeTarget::Comment(comment))
            .await?;
        self.engine
            .invalidate(MutationEvent::new(MutationKind::LikeToggled {
                user: actor.user_id(),
                target: LikedEntity::Comment {
                    comment,
                    post: liked.post(),
                    author: liked.author(),
                },
            }))
            .await;

        Ok(toggle)
    }
}
