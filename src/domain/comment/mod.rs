//! Comment domain

mod entity;
mod repository;

pub use entity::{validate_text, Comment, CommentId, NewComment, MAX_COMMENT_LENGTH};
pub use repository::{CommentFilter, CommentRepository};
