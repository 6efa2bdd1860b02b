//! Post domain

mod entity;
mod factory;
mod repository;

pub use entity::{NewPost, Post, PostId, PostType, Visibility};
pub use factory::{validate_metadata, validate_title, PostDraft, PostFactory, MAX_TITLE_LENGTH};
pub use repository::{PostRepository, PostScope};
