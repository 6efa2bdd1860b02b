//! Construction rules for new posts

use crate::domain::ids::UserId;
use crate::domain::DomainError;

use super::entity::{NewPost, PostType, Visibility};

pub const MAX_TITLE_LENGTH: usize = 255;

/// Unvalidated post input as it arrives from a caller
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub post_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub author: Option<UserId>,
    pub visibility: Option<Visibility>,
}

pub fn validate_title(title: &str) -> Result<(), DomainError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(DomainError::validation("Post title cannot be empty"));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(DomainError::validation(format!(
            "Post title exceeds maximum length of {} characters",
            MAX_TITLE_LENGTH
        )));
    }

    Ok(())
}

fn has_metadata(metadata: Option<&serde_json::Value>) -> bool {
    match metadata {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Image and video posts need non-empty metadata
pub fn validate_metadata(
    post_type: PostType,
    metadata: Option<&serde_json::Value>,
) -> Result<(), DomainError> {
    if post_type.requires_metadata() && !has_metadata(metadata) {
        return Err(DomainError::validation(format!(
            "Metadata is required for {} posts",
            post_type
        )));
    }
    Ok(())
}

/// Validates drafts and turns them into insertable posts
pub struct PostFactory;

impl PostFactory {
    pub fn create(draft: PostDraft) -> Result<NewPost, DomainError> {
        let post_type = match draft.post_type.as_deref() {
            Some(raw) => raw.parse::<PostType>()?,
            None => PostType::default(),
        };

        validate_metadata(post_type, draft.metadata.as_ref())?;

        let author = draft
            .author
            .ok_or_else(|| DomainError::validation("Author is required for creating a post"))?;

        validate_title(&draft.title)?;

        Ok(NewPost {
            title: draft.title.trim().to_string(),
            content: draft.content,
            post_type,
            metadata: draft
                .metadata
                .filter(|m| !m.is_null())
                .unwrap_or_else(|| serde_json::json!({})),
            author,
            visibility: draft.visibility.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> PostDraft {
        PostDraft {
            title: "Hello".to_string(),
            content: "First post".to_string(),
            post_type: Some("text".to_string()),
            metadata: None,
            author: Some(UserId::new(1)),
            visibility: None,
        }
    }

    #[test]
    fn test_text_post() {
        let post = PostFactory::create(draft()).unwrap();

        assert_eq!(post.post_type, PostType::Text);
        assert_eq!(post.metadata, json!({}));
        assert_eq!(post.visibility, Visibility::Public);
    }

    #[test]
    fn test_invalid_post_type() {
        let err = PostFactory::create(PostDraft {
            post_type: Some("poll".to_string()),
            ..draft()
        })
        .unwrap_err();

        assert!(err.to_string().contains("Invalid post type"));
    }

    #[test]
    fn test_image_requires_metadata() {
        let err = PostFactory::create(PostDraft {
            post_type: Some("image".to_string()),
            metadata: Some(json!({})),
            ..draft()
        })
        .unwrap_err();
        assert!(err.to_string().contains("Metadata is required for image posts"));

        let ok = PostFactory::create(PostDraft {
            post_type: Some("image".to_string()),
            metadata: Some(json!({"url": "https://cdn.example.com/cat.png"})),
            ..draft()
        });
        assert!(ok.is_ok());
    }

    #[test]
    fn test_video_requires_metadata() {
        let err = PostFactory::create(PostDraft {
            post_type: Some("video".to_string()),
            ..draft()
        })
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn test_author_required() {
        let err = PostFactory::create(PostDraft {
            author: None,
            ..draft()
        })
        .unwrap_err();

        assert!(err.to_string().contains("Author is required"));
    }

    #[test]
    fn test_title_bounds() {
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(256)).is_err());
        assert!(validate_title(&"t".repeat(255)).is_ok());
    }
}
