//! Likes and follows

mod follow;
mod like;

pub use follow::{validate_follow, FollowCounts, FollowRepository, FollowToggle};
pub use like::{LikeRepository, LikeTarget, LikeToggle};
