//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::domain::ids::UserId;

/// Fields required to register a user; the repository assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    email: String,
    /// Argon2 password hash - never exposed in serialization
    #[serde(skip_serializing, default)]
    password_hash: String,
    is_staff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_photo: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl User {
    /// Materialize a registration under an assigned id
    pub fn from_new(id: UserId, new: NewUser) -> Self {
        let now = Utc::now();

        Self {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            profile_photo: None,
            created_at: now,
            updated_at: now,
        }
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn profile_photo(&self) -> Option<&str> {
        self.profile_photo.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Mutators

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
        self.touch();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.touch();
    }

    pub fn set_password_hash(&mut self, password_hash: impl Into<String>) {
        self.password_hash = password_hash.into();
        self.touch();
    }

    pub fn set_staff(&mut self, is_staff: bool) {
        self.is_staff = is_staff;
        self.touch();
    }

    pub fn set_profile_photo(&mut self, url: Option<String>) {
        self.profile_photo = url;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
