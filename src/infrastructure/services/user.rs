//! User accounts: registration, profile updates, deletion and cached reads

use std::sync::Arc;

use tracing::info;

use crate::domain::cache::{build_key, CacheKind, KeyScope, MutationEvent, MutationKind};
use crate::domain::pagination::{PageEnvelope, PageRequest};
use crate::domain::principal::Principal;
use crate::domain::user::{
    validate_email, validate_password, validate_username, NewUser, User, UserId, UserRepository,
};
use crate::domain::DomainError;
use crate::infrastructure::auth::PasswordHasher;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};

use super::views::UserView;

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    cache: ReadThroughCache,
    engine: InvalidationEngine,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        cache: ReadThroughCache,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            users,
            hasher,
            cache,
            engine,
        }
    }

    pub async fn get(&self, id: UserId) -> Result<UserView, DomainError> {
        let key = build_key(CacheKind::User, &KeyScope::of(id))?;

        self.cache
            .get_or_compute(&key, || async move {
                let user = self.require(id).await?;
                Ok(UserView::from(&user))
            })
            .await
    }

    pub async fn list(&self, page: PageRequest) -> Result<PageEnvelope<UserView>, DomainError> {
        let key = build_key(CacheKind::Users, &KeyScope::global().paged(page))?;

        self.cache
            .get_or_compute_page(
                &key,
                page,
                |page| self.users.list(page),
                |users| async move { Ok(users.iter().map(UserView::from).collect()) },
            )
            .await
    }

    /// Register an account on behalf of a staff member
    pub async fn create(
        &self,
        actor: &Principal,
        request: CreateUserRequest,
    ) -> Result<UserView, DomainError> {
        actor.require_staff()?;
        let user = self.register(request).await?;
        Ok(UserView::from(&user))
    }

    /// Validate, hash and insert a new account
    pub async fn register(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        validate_username(&request.username).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password).map_err(|e| DomainError::validation(e.to_string()))?;

        let password_hash = self.hasher.hash(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                is_staff: request.is_staff,
            })
            .await?;

        info!(user_id = %user.id(), username = %user.username(), "User created");
        self.engine
            .invalidate(MutationEvent::new(MutationKind::UserCreated { user: user.id() }))
            .await;

        Ok(user)
    }

    pub async fn update(
        &self,
        actor: &Principal,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<UserView, DomainError> {
        actor.require_owner_or_staff(id, "user")?;
        let mut user = self.require(id).await?;

        if let Some(username) = request.username {
            validate_username(&username).map_err(|e| DomainError::validation(e.to_string()))?;
            user.set_username(username);
        }
        if let Some(email) = request.email {
            validate_email(&email).map_err(|e| DomainError::validation(e.to_string()))?;
            user.set_email(email);
        }
        if let Some(password) = request.password {
            validate_password(&password).map_err(|e| DomainError::validation(e.to_string()))?;
            user.set_password_hash(self.hasher.hash(&password)?);
        }

        let user = self.users.update(&user).await?;
        self.engine
            .invalidate(MutationEvent::new(MutationKind::UserUpdated { user: id }))
            .await;

        Ok(UserView::from(&user))
    }

    pub async fn delete(&self, actor: &Principal, id: UserId) -> Result<(), DomainError> {
        actor.require_owner_or_staff(id, "user")?;

        if !self.users.delete(id).await? {
            return Err(DomainError::not_found(format!("User {} not found", id)));
        }

        info!(user_id = %id, "User deleted");
        self.engine
            .invalidate(MutationEvent::new(MutationKind::UserDeleted { user: id }))
            .await;

        Ok(())
    }

    /// Check a username/password pair
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let invalid = || DomainError::authentication("Invalid username or password");

        let user = self.users.get_by_username(username).await?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, user.password_hash()) {
            return Err(invalid());
        }

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.users.get_by_username(username).await
    }

    async fn require(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User {} not found", id)))
    }
}
