//! Delivery job.

use fedsync_common::InstanceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Deliver one activity to the shared inbox of one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverJob {
    /// Receiving instance.
    pub recipient: InstanceId,

    /// Activity JSON to deliver.
    pub activity: Value,

    /// Failed attempts so far.
    #[serde(default)]
    pub attempts: u32,
}

impl DeliverJob {
    /// Create a new deliver job.
    #[must_use]
    pub const fn new(recipient: InstanceId, activity: Value) -> Self {
        Self {
            recipient,
            activity,
            attempts: 0,
        }
    }

    /// The activity's actor, asserted to the receiving inbox.
    #[must_use]
    pub fn actor(&self) -> Option<Url> {
        self.activity["actor"]
            .as_str()
            .and_then(|actor| Url::parse(actor).ok())
    }

    /// The activity's id, for logs.
    #[must_use]
    pub fn activity_id(&self) -> &str {
        self.activity["id"].as_str().unwrap_or("?")
    }
}
