//! Shared types for the prism gallery platform
//!
//! Common types used by the client engine and server implementations:
//! entity models, transformation pipeline types, push message types and
//! utility types.

pub mod client;
pub mod message;
pub mod models;
pub mod query;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Push message re-exports (for convenient access)
pub use message::{PushEventType, PushMessage};

// Query re-exports
pub use query::{ImageQuery, PaginatedResponse};
