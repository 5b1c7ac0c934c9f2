//! Push channel message types
//!
//! These types are shared between the server's push endpoint and the
//! client engine. The channel carries job lifecycle events for background
//! transformation jobs; request/response traffic goes over HTTP and never
//! through here.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

pub mod payload;
pub use payload::*;

/// Push event kinds delivered to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushEventType {
    /// A background transformation job finished; payload is the full
    /// transformed image record
    JobSucceeded,
    /// A background transformation job failed; payload is an error message
    JobFailed,
}

impl fmt::Display for PushEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushEventType::JobSucceeded => write!(f, "job-succeeded"),
            PushEventType::JobFailed => write!(f, "job-failed"),
        }
    }
}

/// Push channel message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub request_id: Uuid,
    #[serde(rename = "type")]
    pub event_type: PushEventType,
    pub payload: serde_json::Value,
}

impl PushMessage {
    pub fn new(event_type: PushEventType, payload: serde_json::Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            payload,
        }
    }

    /// Build a job-succeeded message
    pub fn job_succeeded(record: &crate::models::TransformedImage) -> Self {
        Self::new(
            PushEventType::JobSucceeded,
            serde_json::to_value(record).expect("Failed to serialize transformed image"),
        )
    }

    /// Build a job-failed message
    pub fn job_failed(payload: &JobFailedPayload) -> Self {
        Self::new(
            PushEventType::JobFailed,
            serde_json::to_value(payload).expect("Failed to serialize job failure"),
        )
    }

    /// Parse the payload as the given type
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
