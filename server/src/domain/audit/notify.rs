//! In-process change notifications
//!
//! Subscribers receive the full before/after snapshots of each audited
//! change. Delivery is best effort: a send without subscribers is dropped and
//! a slow subscriber skips what it lagged behind on.

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::constants::DEFAULT_NOTIFY_CAPACITY;

/// Change notification carrying full snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeNotification {
    pub audit_id: i64,
    pub actor: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Option<String>,
    pub old: JsonValue,
    pub new: JsonValue,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Subscriber lagged behind, {0} notifications skipped")]
    Lagged(u64),
}

impl From<broadcast::error::RecvError> for NotifyError {
    fn from(e: broadcast::error::RecvError) -> Self {
        match e {
            broadcast::error::RecvError::Closed => NotifyError::Closed,
            broadcast::error::RecvError::Lagged(n) => NotifyError::Lagged(n),
        }
    }
}

/// Publisher side of the change channel
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ChangeNotification>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_CAPACITY)
    }
}

impl ChangeNotifier {
    /// Create a notifier buffering up to `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> ChangeSubscriber {
        ChangeSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish a notification; returns the number of subscribers reached
    pub fn publish(&self, notification: ChangeNotification) -> usize {
        let audit_id = notification.audit_id;
        match self.tx.send(notification) {
            Ok(receivers) => {
                tracing::trace!(audit_id, receivers, "Change notification sent");
                receivers
            }
            Err(_) => {
                tracing::debug!(audit_id, "No subscribers for change notification");
                0
            }
        }
    }
}

/// Subscriber handle for change notifications
pub struct ChangeSubscriber {
    rx: broadcast::Receiver<ChangeNotification>,
}

impl ChangeSubscriber {
    pub async fn recv(&mut self) -> Result<ChangeNotification, NotifyError> {
        self.rx.recv().await.map_err(NotifyError::from)
    }
}
