//! Push event bridge
//!
//! Owns the single streaming connection to the server and merges inbound
//! job events into the store. The connection is keyed by the current
//! credential: swapping credentials tears the connection down and
//! re-establishes it, and with no credential the bridge stays
//! disconnected. Teardown is generation-scoped — a reconnect racing a
//! teardown cannot double-deliver, because the superseded reader is
//! cancelled and awaited before a new one starts.
//!
//! Job results arrive here at-least-once; merging is idempotent on the
//! record id. Events for images the store does not hold are dropped
//! silently — the collection has not loaded, or no longer contains the
//! owner — and the next reconciliation refetch repairs any gap.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use shared::client::Credential;
use shared::message::{JobFailedPayload, NotificationPayload, PushEventType, PushMessage};
use shared::models::TransformedImage;

use crate::channel::PushChannelFactory;
use crate::store::ImageStore;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Maintains the push connection and applies inbound events
pub struct PushBridge {
    store: Arc<ImageStore>,
    factory: Arc<dyn PushChannelFactory>,
    notification_tx: broadcast::Sender<NotificationPayload>,
    connection_state: Arc<StdMutex<ConnectionState>>,
    state: Mutex<BridgeState>,
}

struct BridgeState {
    credential: Option<Credential>,
    connection: Option<ConnectionHandle>,
}

struct ConnectionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl PushBridge {
    pub fn new(store: Arc<ImageStore>, factory: Arc<dyn PushChannelFactory>) -> Arc<Self> {
        let (notification_tx, _) = broadcast::channel(256);
        Arc::new(Self {
            store,
            factory,
            notification_tx,
            connection_state: Arc::new(StdMutex::new(ConnectionState::Disconnected)),
            state: Mutex::new(BridgeState {
                credential: None,
                connection: None,
            }),
        })
    }

    /// User-visible notifications raised by inbound events
    ///
    /// Fire-and-forget: a lagging subscriber misses rather than blocks.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationPayload> {
        self.notification_tx.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_state.lock().unwrap()
    }

    /// Re-evaluate the connection against a (possibly new) credential
    ///
    /// Same credential: the live connection is kept. Different
    /// credential: torn down and re-established. `None`: torn down and
    /// left disconnected.
    pub async fn set_credential(self: &Arc<Self>, credential: Option<Credential>) {
        let mut state = self.state.lock().await;

        let alive = state
            .connection
            .as_ref()
            .is_some_and(|c| !c.task.is_finished());
        if state.credential == credential && alive {
            return;
        }

        if let Some(mut connection) = state.connection.take() {
            connection.cancel.cancel();
            // Wait the old reader out so it cannot race the new one
            if let Err(e) = (&mut connection.task).await {
                if !e.is_cancelled() {
                    tracing::warn!("Push reader task failed: {}", e);
                }
            }
            *self.connection_state.lock().unwrap() = ConnectionState::Disconnected;
        }

        state.credential = credential.clone();

        let Some(credential) = credential else {
            return;
        };

        let cancel = CancellationToken::new();
        let this = self.clone();
        let reader_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            this.run_connection(credential, reader_cancel).await;
        });
        state.connection = Some(ConnectionHandle { cancel, task });
    }

    async fn run_connection(self: Arc<Self>, credential: Credential, cancel: CancellationToken) {
        *self.connection_state.lock().unwrap() = ConnectionState::Connecting;

        let opened = tokio::select! {
            _ = cancel.cancelled() => None,
            opened = self.factory.open(&credential) => Some(opened),
        };

        let mut channel = match opened {
            Some(Ok(channel)) => channel,
            Some(Err(e)) => {
                tracing::warn!(user_id = %credential.user_id, "Push connection failed: {}", e);
                *self.connection_state.lock().unwrap() = ConnectionState::Disconnected;
                return;
            }
            None => {
                *self.connection_state.lock().unwrap() = ConnectionState::Disconnected;
                return;
            }
        };

        *self.connection_state.lock().unwrap() = ConnectionState::Connected;
        tracing::debug!(user_id = %credential.user_id, "Push channel connected");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    channel.disconnect().await;
                    break;
                }
                msg = channel.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => {
                        tracing::debug!("Push channel closed by peer");
                        break;
                    }
                }
            }
        }

        *self.connection_state.lock().unwrap() = ConnectionState::Disconnected;
    }

    fn handle_message(&self, msg: PushMessage) {
        match msg.event_type {
            PushEventType::JobSucceeded => {
                let record: TransformedImage = match msg.parse_payload() {
                    Ok(record) => record,
                    Err(e) => {
                        tracing::warn!("Malformed job-succeeded payload: {}", e);
                        return;
                    }
                };
                self.merge_job_result(record);
            }
            PushEventType::JobFailed => {
                let payload: JobFailedPayload = match msg.parse_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("Malformed job-failed payload: {}", e);
                        return;
                    }
                };
                tracing::debug!(image_id = ?payload.image_id, "Transformation job failed");
                let _ = self
                    .notification_tx
                    .send(NotificationPayload::error("Transformation failed", payload.message));
            }
        }
    }

    fn merge_job_result(&self, record: TransformedImage) {
        let record_id = record.id.clone();
        let owner_id = record.original_image_id.clone();
        let data = serde_json::to_value(&record).ok();

        let appended = self.store.patch(&owner_id, |img| {
            // At-least-once delivery: a record id we already hold is a dup
            if img.transformed_images.iter().any(|t| t.id == record.id) {
                return false;
            }
            img.transformed_images.push(record);
            true
        });

        if !appended {
            // Owner not loaded (or already holds the record) — drop
            tracing::debug!(
                image_id = %owner_id,
                transformed_id = %record_id,
                "Dropped job result without a store target"
            );
            return;
        }

        let mut notification =
            NotificationPayload::info("Transformation ready", "A transformed image is available");
        if let Some(data) = data {
            notification = notification.with_data(data);
        }
        let _ = self.notification_tx.send(notification);
    }
}
