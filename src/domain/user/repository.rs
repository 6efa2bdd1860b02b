//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserId};
use crate::domain::pagination::{Page, PageRequest};
use crate::domain::DomainError;

/// Source-of-record access for users
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Lookup used by login
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Insert a new user; username and email must be unique
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Delete a user together with their posts, comments, likes and follow edges
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;

    /// Newest first
    async fn list(&self, page: PageRequest) -> Result<Page<User>, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;

    async fn exists(&self, id: UserId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }
}
