//! Outbound delivery seam.
//!
//! The announcer decides what goes where; a [`DeliveryQueue`] implementation
//! (see `fedsync-queue`) owns retries and transport.

use std::sync::Arc;

use async_trait::async_trait;
use fedsync_common::{AppResult, InstanceId};
use serde_json::Value;
use tokio::sync::Mutex;

/// Queue accepting activities for fire-and-forget delivery.
#[async_trait]
pub trait DeliveryQueue: Send + Sync {
    /// Enqueue `activity` for the shared inbox of `recipient`.
    async fn enqueue(&self, recipient: InstanceId, activity: Value) -> AppResult<()>;
}

/// Shared handle to the delivery queue.
pub type DeliveryQueueService = Arc<dyn DeliveryQueue>;

/// Queue that keeps everything it is given.
#[derive(Clone, Default)]
pub struct CollectingQueue {
    sent: Arc<Mutex<Vec<(InstanceId, Value)>>>,
}

impl CollectingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything enqueued so far.
    pub async fn sent(&self) -> Vec<(InstanceId, Value)> {
        self.sent.lock().await.clone()
    }

    /// Activity types enqueued for `recipient`, in order.
    pub async fn types_for(&self, recipient: &InstanceId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, activity)| activity_type(activity))
            .collect()
    }

    /// Forget everything enqueued so far.
    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl DeliveryQueue for CollectingQueue {
    async fn enqueue(&self, recipient: InstanceId, activity: Value) -> AppResult<()> {
        self.sent.lock().await.push((recipient, activity));
        Ok(())
    }
}

/// Queue for nodes with federation disabled.
#[derive(Clone, Copy, Default)]
pub struct DiscardingQueue;

#[async_trait]
impl DeliveryQueue for DiscardingQueue {
    async fn enqueue(&self, recipient: InstanceId, activity: Value) -> AppResult<()> {
        tracing::debug!(
            instance = %recipient,
            activity = %activity_type(&activity),
            "Federation disabled, dropping activity"
        );
        Ok(())
    }
}

/// `type` of an activity, with the wrapped type for an Announce
/// (`Announce/Lock`).
#[must_use]
pub fn activity_type(activity: &Value) -> String {
    let kind = activity["type"].as_str().unwrap_or("?");
    match activity["object"]["type"].as_str() {
        Some(inner) if kind == "Announce" || kind == "Undo" => format!("{kind}/{inner}"),
        _ => kind.to_string(),
    }
}
