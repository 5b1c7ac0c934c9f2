//! Client-facing response and credential types

use serde::{Deserialize, Serialize};

/// Generic API response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Authenticated identity
///
/// Keys the push connection and the like-membership test. Token refresh is
/// the auth layer's business; the engine only ever swaps whole credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    pub token: String,
}

impl Credential {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

/// Outcome of a transformation request
///
/// The server returns the record directly when an identical pipeline for
/// the same base image already exists; otherwise it accepts a background
/// job whose result arrives on the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransformOutcome {
    Ready {
        image: crate::models::TransformedImage,
    },
    Accepted {
        job_id: String,
    },
}
