//! Mutation coordinator
//!
//! Every user-initiated write runs the same four-phase protocol:
//! snapshot, optimistic patch, remote call, reconcile-or-rollback. The
//! phases up to the remote call run synchronously inside the calling
//! method, so the store already reflects user intent when the method
//! returns; the remote call and reconciliation settle on a spawned task
//! reachable through the returned [`Settlement`].
//!
//! Per logical key (one image's like-state, visibility, download count,
//! ...) at most one optimistic patch is ever pending: a newer mutation on
//! the same key bumps the key's generation, and a superseded mutation
//! skips its rollback when it settles. The superseded mutation's
//! reconciliation refetch still fires against a snapshot that may be
//! stale; the last reconciliation wins. That race is accepted.
//!
//! Methods must be called within a Tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use shared::client::{Credential, TransformOutcome};
use shared::models::{Image, Like};
use shared::query::ImageQuery;

use crate::error::{ClientError, ClientResult};
use crate::pipeline::TransformationDraft;
use crate::store::ImageStore;
use crate::transport::{ApiTransport, UploadRequest};

/// Supported upload formats
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Maximum upload size (10MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Logical key of an in-flight mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Like(String),
    Visibility(String),
    Download(String),
    Upload,
    Transform(String),
    DeleteImage(String),
    DeleteTransformed(String),
}

struct KeyState {
    generation: u64,
    in_flight: bool,
}

/// Handle to a mutation's eventual settlement
///
/// Awaiting it is purely for UI orchestration (closing a dialog,
/// re-enabling a button); the store converges whether or not anyone
/// awaits.
pub struct Settlement<T = ()> {
    rx: oneshot::Receiver<ClientResult<T>>,
}

impl<T> Settlement<T> {
    pub async fn settled(self) -> ClientResult<T> {
        self.rx
            .await
            .map_err(|_| ClientError::Internal("Mutation task dropped".to_string()))?
    }
}

/// Coordinates optimistic writes against the store and the transport
pub struct MutationCoordinator {
    store: Arc<ImageStore>,
    transport: Arc<dyn ApiTransport>,
    credential: Mutex<Option<Credential>>,
    keys: Mutex<HashMap<MutationKey, KeyState>>,
    refetch_query: Mutex<ImageQuery>,
}

impl MutationCoordinator {
    pub fn new(store: Arc<ImageStore>, transport: Arc<dyn ApiTransport>) -> Arc<Self> {
        Arc::new(Self {
            store,
            transport,
            credential: Mutex::new(None),
            keys: Mutex::new(HashMap::new()),
            refetch_query: Mutex::new(ImageQuery::default()),
        })
    }

    /// Swap the authenticated identity used for like-membership tests
    pub fn set_credential(&self, credential: Option<Credential>) {
        *self.credential.lock().unwrap() = credential;
    }

    /// Whether a mutation on the key is awaiting settlement
    ///
    /// The UI uses this to disable affordances whose end state cannot be
    /// guessed (upload, transform, delete).
    pub fn is_pending(&self, key: &MutationKey) -> bool {
        self.keys
            .lock()
            .unwrap()
            .get(key)
            .map(|s| s.in_flight)
            .unwrap_or(false)
    }

    /// Initial load; the query is remembered for reconciliation refetches
    pub async fn load(&self, query: ImageQuery) -> ClientResult<()> {
        let page = self.transport.list_images(&query).await?;
        *self.refetch_query.lock().unwrap() = query;
        self.store.replace_all(page.data);
        Ok(())
    }

    /// Replace store contents with authoritative server data
    ///
    /// Failures are logged and swallowed; the next mutation triggers
    /// another pass.
    pub async fn reconcile(&self) {
        let query = self.refetch_query.lock().unwrap().clone();
        match self.transport.list_images(&query).await {
            Ok(page) => self.store.replace_all(page.data),
            Err(e) => {
                tracing::warn!("Reconciliation refetch failed: {}", e);
            }
        }
    }

    // ========== Key bookkeeping ==========

    fn begin(&self, key: &MutationKey) -> u64 {
        let mut keys = self.keys.lock().unwrap();
        let state = keys.entry(key.clone()).or_insert(KeyState {
            generation: 0,
            in_flight: false,
        });
        state.generation += 1;
        state.in_flight = true;
        state.generation
    }

    /// Clear the in-flight flag if `generation` is still current.
    /// Returns whether it was — a superseded mutation must not roll back
    /// over its successor's patch.
    fn finish(&self, key: &MutationKey, generation: u64) -> bool {
        let mut keys = self.keys.lock().unwrap();
        match keys.get_mut(key) {
            Some(state) if state.generation == generation => {
                state.in_flight = false;
                true
            }
            _ => false,
        }
    }

    // ========== Optimistic toggles ==========

    /// Toggle the current user's like on an image
    ///
    /// Membership decides the direction: an existing like by this user
    /// means unlike, otherwise a locally-tagged like is inserted until
    /// the next reconciliation brings the server record.
    pub fn toggle_like(self: &Arc<Self>, image_id: &str) -> ClientResult<Settlement> {
        let user_id = self
            .credential
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.user_id.clone())
            .ok_or(ClientError::Unauthorized)?;

        let key = MutationKey::Like(image_id.to_string());
        let generation = self.begin(&key);

        let mut prior: Vec<Like> = Vec::new();
        let mut now_liked = false;
        let changed = self.store.patch(image_id, |img| {
            prior = img.likes.clone();
            match img.likes.iter().position(|l| l.user_id == user_id) {
                Some(pos) => {
                    img.likes.remove(pos);
                    now_liked = false;
                }
                None => {
                    img.likes.push(Like::local(user_id.clone()));
                    now_liked = true;
                }
            }
            true
        });
        if !changed {
            self.finish(&key, generation);
            return Err(ClientError::NotFound(image_id.to_string()));
        }

        let this = self.clone();
        let image_id = image_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this.transport.set_like(&image_id, now_liked).await;
            let current = this.finish(&key, generation);
            if result.is_err() && current {
                this.store.patch(&image_id, |img| {
                    img.likes = prior;
                    true
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    /// Flip an image between public and private
    pub fn toggle_visibility(self: &Arc<Self>, image_id: &str) -> ClientResult<Settlement> {
        let key = MutationKey::Visibility(image_id.to_string());
        let generation = self.begin(&key);

        let mut prior = false;
        let mut now_public = false;
        let changed = self.store.patch(image_id, |img| {
            prior = img.is_public;
            img.is_public = !img.is_public;
            now_public = img.is_public;
            true
        });
        if !changed {
            self.finish(&key, generation);
            return Err(ClientError::NotFound(image_id.to_string()));
        }

        let this = self.clone();
        let image_id = image_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this.transport.set_visibility(&image_id, now_public).await;
            let current = this.finish(&key, generation);
            if result.is_err() && current {
                this.store.patch(&image_id, |img| {
                    img.is_public = prior;
                    true
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    /// Bump an image's download counter
    ///
    /// The bump is confirmed, never reverted, on success; the
    /// reconciliation refetch converges the absolute count.
    pub fn record_download(self: &Arc<Self>, image_id: &str) -> ClientResult<Settlement> {
        let key = MutationKey::Download(image_id.to_string());
        let generation = self.begin(&key);

        let mut prior = 0u64;
        let changed = self.store.patch(image_id, |img| {
            prior = img.downloads_count;
            img.downloads_count += 1;
            true
        });
        if !changed {
            self.finish(&key, generation);
            return Err(ClientError::NotFound(image_id.to_string()));
        }

        let this = self.clone();
        let image_id = image_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this.transport.record_download(&image_id).await;
            let current = this.finish(&key, generation);
            if result.is_err() && current {
                this.store.patch(&image_id, |img| {
                    img.downloads_count = prior;
                    true
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    // ========== Pending-flag mutations ==========

    /// Upload a new image
    ///
    /// No optimistic insert — the id and URL are unknown until the server
    /// responds — so the UI disables the affordance via
    /// [`is_pending`](Self::is_pending) instead.
    pub fn upload(
        self: &Arc<Self>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> ClientResult<Settlement<Image>> {
        let file_name = file_name.into();
        let ext = file_name
            .rsplit('.')
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
            return Err(ClientError::Validation(format!(
                "Unsupported format '{}'. Supported: {}",
                ext,
                SUPPORTED_FORMATS.join(", ")
            )));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ClientError::Validation(format!(
                "File too large. Maximum size is {}MB",
                MAX_UPLOAD_BYTES / 1024 / 1024
            )));
        }

        let key = MutationKey::Upload;
        let generation = self.begin(&key);

        let this = self.clone();
        Ok(self.settle(move |tx| async move {
            let result = this
                .transport
                .upload_image(UploadRequest { file_name, bytes })
                .await;
            this.finish(&key, generation);
            if let Ok(image) = &result {
                let image = image.clone();
                this.store.patch_all(|images| {
                    if images.iter().any(|i| i.id == image.id) {
                        return false;
                    }
                    images.push(image);
                    true
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    /// Submit a transformation pipeline for an image
    ///
    /// The draft is validated before anything else happens; an invalid
    /// draft surfaces immediately with no store mutation and no remote
    /// call. A `Ready` outcome (server recognized an identical pipeline)
    /// is merged synchronously; an `Accepted` job arrives later on the
    /// push channel.
    pub fn request_transformation(
        self: &Arc<Self>,
        image_id: &str,
        draft: &TransformationDraft,
    ) -> ClientResult<Settlement<TransformOutcome>> {
        let transformation = draft.build_request()?;

        let key = MutationKey::Transform(image_id.to_string());
        let generation = self.begin(&key);

        let this = self.clone();
        let image_id = image_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this
                .transport
                .request_transformation(&image_id, &transformation)
                .await;
            this.finish(&key, generation);
            if let Ok(TransformOutcome::Ready { image }) = &result {
                let record = image.clone();
                let owner_id = record.original_image_id.clone();
                this.store.patch(&owner_id, |img| {
                    if img.transformed_images.iter().any(|t| t.id == record.id) {
                        return false;
                    }
                    img.transformed_images.push(record);
                    true
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    /// Delete an image
    ///
    /// Removal cascades the whole transformed subtree out of the view;
    /// the backend owns the real cascade.
    pub fn delete_image(self: &Arc<Self>, image_id: &str) -> ClientResult<Settlement> {
        let key = MutationKey::DeleteImage(image_id.to_string());
        let generation = self.begin(&key);

        let this = self.clone();
        let image_id = image_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this.transport.delete_image(&image_id).await;
            this.finish(&key, generation);
            if result.is_ok() {
                this.store.patch_all(|images| {
                    let before = images.len();
                    images.retain(|i| i.id != image_id);
                    images.len() != before
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    /// Delete a single transformed derivative
    pub fn delete_transformed_image(
        self: &Arc<Self>,
        transformed_id: &str,
    ) -> ClientResult<Settlement> {
        let key = MutationKey::DeleteTransformed(transformed_id.to_string());
        let generation = self.begin(&key);

        let this = self.clone();
        let transformed_id = transformed_id.to_string();
        Ok(self.settle(move |tx| async move {
            let result = this.transport.delete_transformed_image(&transformed_id).await;
            this.finish(&key, generation);
            if result.is_ok() {
                this.store.patch_all(|images| {
                    let mut removed = false;
                    for image in images.iter_mut() {
                        let before = image.transformed_images.len();
                        image.transformed_images.retain(|t| t.id != transformed_id);
                        removed |= image.transformed_images.len() != before;
                    }
                    removed
                });
            }
            let _ = tx.send(result);
            this.reconcile().await;
        }))
    }

    // Spawn the settle task for phases three and four. The settlement is
    // sent before the reconciliation refetch so awaiting callers are not
    // held up by it.
    fn settle<T, F, Fut>(&self, task: F) -> Settlement<T>
    where
        T: Send + 'static,
        F: FnOnce(oneshot::Sender<ClientResult<T>>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(task(tx));
        Settlement { rx }
    }
}
