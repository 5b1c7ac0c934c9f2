//! Image Model

use serde::{Deserialize, Serialize};

use crate::models::transformation::Transformation;
use crate::types::Timestamp;

/// Image entity
///
/// The unit of the gallery: one uploaded image plus every transformed
/// derivative the server has produced for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Stable identifier, immutable after creation
    pub id: String,
    pub original_name: String,
    /// Size in bytes
    pub size: u64,
    pub secure_url: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub is_public: bool,
    pub downloads_count: u64,
    /// Like records keyed by id, one per user
    #[serde(default)]
    pub likes: Vec<Like>,
    /// Transformed derivatives, append-only from the client's perspective
    #[serde(default)]
    pub transformed_images: Vec<TransformedImage>,
}

impl Image {
    /// Check whether the given user has a like on this image
    pub fn liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l.user_id == user_id)
    }
}

/// Like record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: String,
    pub user_id: String,
}

impl Like {
    /// Build a locally-tagged placeholder like, replaced by server truth
    /// on the next reconciliation.
    pub fn local(user_id: impl Into<String>) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            user_id: user_id.into(),
        }
    }
}

/// Transformed image entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedImage {
    pub id: String,
    /// Owning image (back-reference, not owning)
    pub original_image_id: String,
    /// Parent derivative for transformation-of-a-transformation chains
    pub parent_id: Option<String>,
    pub size: u64,
    pub secure_url: String,
    /// The applied pipeline
    pub transformation: Transformation,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Upload response payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub image: Image,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liked_by() {
        let mut image = Image {
            id: "img-1".to_string(),
            original_name: "cat.jpg".to_string(),
            size: 1024,
            secure_url: "https://cdn.example/cat.jpg".to_string(),
            created_at: 0,
            updated_at: 0,
            is_public: false,
            downloads_count: 0,
            likes: vec![],
            transformed_images: vec![],
        };
        assert!(!image.liked_by("u-1"));

        image.likes.push(Like {
            id: "like-1".to_string(),
            user_id: "u-1".to_string(),
        });
        assert!(image.liked_by("u-1"));
        assert!(!image.liked_by("u-2"));
    }

    #[test]
    fn test_local_like_tag() {
        let a = Like::local("u-1");
        let b = Like::local("u-1");
        assert!(a.id.starts_with("local-"));
        assert_ne!(a.id, b.id);
    }
}
