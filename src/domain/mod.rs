//! Domain layer - entities, repository traits and cache contracts

pub mod cache;
pub mod comment;
pub mod engagement;
pub mod error;
pub mod ids;
pub mod pagination;
pub mod post;
pub mod principal;
pub mod user;

pub use cache::{Cache, CacheExt, CacheKey, CacheKind, KeyScope, MutationEvent, MutationKind};
pub use comment::{Comment, CommentFilter, CommentId, CommentRepository, NewComment};
pub use engagement::{FollowCounts, FollowRepository, LikeRepository, LikeTarget};
pub use error::DomainError;
pub use ids::{PostId, UserId};
pub use pagination::{Page, PageEnvelope, PageRequest};
pub use post::{NewPost, Post, PostRepository, PostScope, PostType, Visibility};
pub use principal::Principal;
pub use user::{NewUser, User, UserRepository};
