//! Push channel capability
//!
//! A push channel is a persistent server-to-client notification stream,
//! distinct from the request/response transport. The engine only consumes
//! the capability; `MemoryChannel` is the in-process implementation used
//! by tests and examples.

use async_trait::async_trait;
use tokio::sync::broadcast;

use shared::client::Credential;
use shared::message::PushMessage;

use crate::error::ClientResult;

/// An established push connection
#[async_trait]
pub trait PushChannel: Send {
    /// Next inbound message; `None` when the connection is gone
    async fn recv(&mut self) -> Option<PushMessage>;

    /// Tear the connection down
    async fn disconnect(&mut self);
}

/// Opens push connections for a credential
#[async_trait]
pub trait PushChannelFactory: Send + Sync {
    async fn open(&self, credential: &Credential) -> ClientResult<Box<dyn PushChannel>>;
}

// ========== In-memory implementation ==========

/// Server side of an in-memory channel pair
///
/// Clones share the underlying broadcast sender, so one hub can feed any
/// number of connections.
#[derive(Debug, Clone)]
pub struct MemoryChannelHub {
    tx: broadcast::Sender<PushMessage>,
}

impl MemoryChannelHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Publish a message to every open connection
    pub fn publish(&self, msg: PushMessage) {
        if let Err(e) = self.tx.send(msg) {
            tracing::debug!("No connections for push message: {}", e);
        }
    }

    /// Number of currently open connections
    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushChannelFactory for MemoryChannelHub {
    async fn open(&self, _credential: &Credential) -> ClientResult<Box<dyn PushChannel>> {
        Ok(Box::new(MemoryChannel {
            rx: Some(self.tx.subscribe()),
        }))
    }
}

struct MemoryChannel {
    rx: Option<broadcast::Receiver<PushMessage>>,
}

#[async_trait]
impl PushChannel for MemoryChannel {
    async fn recv(&mut self) -> Option<PushMessage> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(msg) => return Some(msg),
                // A slow reader misses messages rather than erroring out
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push channel lagged, messages dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn disconnect(&mut self) {
        self.rx = None;
    }
}
