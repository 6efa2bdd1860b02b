//! Profile photo URLs

use std::sync::Arc;

use validator::ValidateUrl;

use crate::domain::cache::{build_key, CacheKind, KeyScope, MutationEvent, MutationKind};
use crate::domain::principal::Principal;
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::cache::{InvalidationEngine, ReadThroughCache};

use super::views::ProfilePhotoView;

#[derive(Debug, Clone)]
pub struct ProfilePhotoService {
    users: Arc<dyn UserRepository>,
    cache: ReadThroughCache,
    engine: InvalidationEngine,
}

impl ProfilePhotoService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: ReadThroughCache,
        engine: InvalidationEngine,
    ) -> Self {
        Self {
            users,
            cache,
            engine,
        }
    }

    pub async fn get(&self, user: UserId) -> Result<ProfilePhotoView, DomainError> {
        let key = build_key(CacheKind::ProfilePhoto, &KeyScope::of(user))?;

        self.cache
            .get_or_compute(&key, || async move {
                let user = self
                    .users
                    .get(user)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("User {} not found", user)))?;
                Ok(ProfilePhotoView::from(&user))
            })
            .await
    }

    /// Replace (or clear, with `None`) the photo URL of `user`
    pub async fn update(
        &self,
        actor: &Principal,
        user: UserId,
        url: Option<String>,
    ) -> Result<ProfilePhotoView, DomainError> {
        actor.require_owner_or_staff(user, "profile photo")?;

        if let Some(url) = &url {
            if !url.validate_url() {
                return Err(DomainError::validation("Profile photo must be a valid URL"));
            }
        }

        let mut account = self
            .users
            .get(user)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User {} not found", user)))?;
        account.set_profile_photo(url);
        let account = self.users.update(&account).await?;

        self.engine
            .invalidate(MutationEvent::new(MutationKind::ProfilePhotoUpdated { user }))
            .await;

        Ok(ProfilePhotoView::from(&account))
    }
}
