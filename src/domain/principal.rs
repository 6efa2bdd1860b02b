//! The authenticated caller and the ownership checks applied to it

use serde::{Deserialize, Serialize};

use super::ids::UserId;
use super::post::Visibility;
use super::DomainError;

/// Identity of the caller, as established by the endpoint layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    user_id: UserId,
    is_staff: bool,
}

impl Principal {
    pub fn new(user_id: UserId, is_staff: bool) -> Self {
        Self { user_id, is_staff }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    /// Owner-or-admin rule for mutating a resource owned by `owner`
    pub fn can_modify(&self, owner: UserId) -> bool {
        self.is_staff || self.user_id == owner
    }

    pub fn require_owner_or_staff(&self, owner: UserId, resource: &str) -> Result<(), DomainError> {
        if self.can_modify(owner) {
            Ok(())
        } else {
            Err(DomainError::permission_denied(format!(
                "Only the owner or an administrator can modify this {}",
                resource
            )))
        }
    }

    pub fn require_staff(&self) -> Result<(), DomainError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(DomainError::permission_denied(
                "Administrator privileges required",
            ))
        }
    }

    /// Public posts are visible to everyone; private ones to their author and staff
    pub fn can_view(&self, visibility: Visibility, author: UserId) -> bool {
        visibility == Visibility::Public || self.can_modify(author)
    }
}
