//! Prism Client - gallery sync engine
//!
//! Client-side entity cache for the prism gallery platform: an in-memory
//! image store mutated optimistically by user actions and reconciled
//! against job results arriving on an asynchronous push channel.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod mutation;
pub mod pipeline;
pub mod push;
pub mod store;
pub mod transport;

pub use channel::{MemoryChannelHub, PushChannel, PushChannelFactory};
pub use client::PrismClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use mutation::{MutationCoordinator, MutationKey, Settlement};
pub use pipeline::{PipelineError, TransformationDraft, repair_order};
pub use push::{ConnectionState, PushBridge};
pub use store::{Collection, ImageStore, SubscriptionGuard};
pub use transport::{ApiTransport, HttpTransport, UploadRequest};

// Re-export shared types for convenience
pub use shared::client::{Credential, TransformOutcome};
pub use shared::models::{Image, Like, Transformation, TransformedImage};
pub use shared::query::{ImageQuery, PaginatedResponse};
