//! Comment entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::domain::ids::CommentId;
use crate::domain::ids::{PostId, UserId};
use crate::domain::DomainError;

pub const MAX_COMMENT_LENGTH: usize = 2000;

pub fn validate_text(text: &str) -> Result<(), DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::validation("Comment text cannot be empty"));
    }

    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(DomainError::validation(format!(
            "Comment exceeds maximum length of {} characters",
            MAX_COMMENT_LENGTH
        )));
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub text: String,
    pub author: UserId,
    pub post: PostId,
}

impl NewComment {
    pub fn new(text: impl Into<String>, author: UserId, post: PostId) -> Result<Self, DomainError> {
        let text = text.into();
        validate_text(&text)?;

        Ok(Self { text, author, post })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    id: CommentId,
    text: String,
    author: UserId,
    post: PostId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn from_new(id: CommentId, new: NewComment) -> Self {
        let now = Utc::now();

        Self {
            id,
            text: new.text,
            author: new.author,
            post: new.post,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> CommentId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn post(&self) -> PostId {
        self.post
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), DomainError> {
        let text = text.into();
        validate_text(&text)?;
        self.text = text;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment_validation() {
        assert!(NewComment::new("Nice!", UserId::new(1), PostId::new(1)).is_ok());
        assert!(NewComment::new("   ", UserId::new(1), PostId::new(1)).is_err());
        assert!(NewComment::new("x".repeat(2001), UserId::new(1), PostId::new(1)).is_err());
    }

    #[test]
    fn test_set_text_rejects_empty() {
        let new = NewComment::new("Nice!", UserId::new(1), PostId::new(1)).unwrap();
        let mut comment = Comment::from_new(CommentId::new(1), new);

        assert!(comment.set_text("").is_err());
        assert_eq!(comment.text(), "Nice!");

        comment.set_text("Edited").unwrap();
        assert_eq!(comment.text(), "Edited");
    }
}
