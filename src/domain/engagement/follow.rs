//! Follow edges between users

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::ids::UserId;
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowToggle {
    pub following: bool,
}

/// Follower and following totals for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub user: UserId,
    pub followers: usize,
    pub following: usize,
}

pub fn validate_follow(follower: UserId, followee: UserId) -> Result<(), DomainError> {
    if follower == followee {
        return Err(DomainError::validation("You cannot follow yourself"));
    }
    Ok(())
}

#[async_trait]
pub trait FollowRepository: Send + Sync + Debug {
    /// Add the edge if absent, remove it if present
    async fn toggle(&self, follower: UserId, followee: UserId)
    -> Result<FollowToggle, DomainError>;

    async fn counts(&self, user: UserId) -> Result<FollowCounts, DomainError>;

    /// Users that `user` follows
    async fn following(&self, user: UserId) -> Result<Vec<UserId>, DomainError>;

    /// Counts for every user, newest user first
    async fn all_counts(&self, page: PageRequest) -> Result<Page<FollowCounts>, DomainError>;
}
