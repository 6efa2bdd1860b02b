//! Post entity and related types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::domain::ids::PostId;
use crate::domain::ids::UserId;
use crate::domain::DomainError;

/// Kind of content carried by a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    #[default]
    Text,
    Image,
    Video,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Media posts must describe their media in `metadata`
    pub fn requires_metadata(&self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PostType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            _ => Err(DomainError::validation(format!("Invalid post type: '{}'", s))),
        }
    }
}

/// Who may see a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Validated fields of a post about to be inserted
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub post_type: PostType,
    pub metadata: serde_json::Value,
    pub author: UserId,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    id: PostId,
    title: String,
    content: String,
    post_type: PostType,
    metadata: serde_json::Value,
    author: UserId,
    visibility: Visibility,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Post {
    pub fn from_new(id: PostId, new: NewPost) -> Self {
        let now = Utc::now();

        Self {
            id,
            title: new.title,
            content: new.content,
            post_type: new.post_type,
            metadata: new.metadata,
            author: new.author,
            visibility: new.visibility,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> PostId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.touch();
    }

    pub fn set_metadata(&mut self, metadata: serde_json::Value) {
        self.metadata = metadata;
        self.touch();
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
