//! Gallery client facade
//!
//! Wires the store, the mutation coordinator and the push bridge together
//! and exposes the surface the presentation layer consumes: `read`,
//! `subscribe`, one method per mutation, and credential management that
//! keeps the coordinator and the bridge in agreement.

use std::sync::Arc;

use tokio::sync::broadcast;

use shared::client::{Credential, TransformOutcome};
use shared::message::NotificationPayload;
use shared::models::Image;
use shared::query::ImageQuery;

use crate::channel::PushChannelFactory;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::mutation::{MutationCoordinator, MutationKey, Settlement};
use crate::pipeline::TransformationDraft;
use crate::push::{ConnectionState, PushBridge};
use crate::store::{Collection, ImageStore, SubscriptionGuard};
use crate::transport::ApiTransport;

/// The assembled gallery sync engine
pub struct PrismClient {
    store: Arc<ImageStore>,
    coordinator: Arc<MutationCoordinator>,
    bridge: Arc<PushBridge>,
}

impl PrismClient {
    /// Assemble the engine from its capabilities
    pub fn new(transport: Arc<dyn ApiTransport>, push: Arc<dyn PushChannelFactory>) -> Self {
        let store = ImageStore::new();
        let coordinator = MutationCoordinator::new(store.clone(), transport);
        let bridge = PushBridge::new(store.clone(), push);
        Self {
            store,
            coordinator,
            bridge,
        }
    }

    /// Assemble with the HTTP transport built from `config`
    pub fn from_config(config: &ClientConfig, push: Arc<dyn PushChannelFactory>) -> Self {
        Self::new(Arc::new(config.build_http_transport()), push)
    }

    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// Current collection handle (`None` until the first load)
    pub fn read(&self) -> Option<Collection> {
        self.store.read()
    }

    /// Register a store listener; the guard unsubscribes on drop
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionGuard
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// User-visible notifications from the push bridge
    pub fn notifications(&self) -> broadcast::Receiver<NotificationPayload> {
        self.bridge.subscribe_notifications()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.bridge.connection_state()
    }

    /// Swap the authenticated identity
    ///
    /// Updates the coordinator's like-membership identity and lets the
    /// bridge decide whether its connection survives.
    pub async fn set_credential(&self, credential: Option<Credential>) {
        self.coordinator.set_credential(credential.clone());
        self.bridge.set_credential(credential).await;
    }

    /// Initial load of the gallery collection
    pub async fn load(&self, query: ImageQuery) -> ClientResult<()> {
        self.coordinator.load(query).await
    }

    // ========== Mutations ==========

    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.coordinator.is_pending(key)
    }

    pub fn toggle_like(&self, image_id: &str) -> ClientResult<Settlement> {
        self.coordinator.toggle_like(image_id)
    }

    pub fn toggle_visibility(&self, image_id: &str) -> ClientResult<Settlement> {
        self.coordinator.toggle_visibility(image_id)
    }

    pub fn record_download(&self, image_id: &str) -> ClientResult<Settlement> {
        self.coordinator.record_download(image_id)
    }

    pub fn upload(
        &self,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> ClientResult<Settlement<Image>> {
        self.coordinator.upload(file_name, bytes)
    }

    pub fn request_transformation(
        &self,
        image_id: &str,
        draft: &TransformationDraft,
    ) -> ClientResult<Settlement<TransformOutcome>> {
        self.coordinator.request_transformation(image_id, draft)
    }

    pub fn delete_image(&self, image_id: &str) -> ClientResult<Settlement> {
        self.coordinator.delete_image(image_id)
    }

    pub fn delete_transformed_image(&self, transformed_id: &str) -> ClientResult<Settlement> {
        self.coordinator.delete_transformed_image(transformed_id)
    }
}
