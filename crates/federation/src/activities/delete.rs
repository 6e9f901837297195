//! Delete activity.

use activitypub_federation::kinds::activity::DeleteType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Delete activity for a post.
///
/// Sent by the creator it tombstones the post. With `remove` set it is a
/// moderator removal instead.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteActivity {
    #[serde(rename = "type")]
    pub kind: DeleteType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    /// Community the post belongs to.
    pub audience: Url,
    pub published: DateTime<Utc>,

    #[serde(default)]
    pub remove: bool,

    /// Removal reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl DeleteActivity {
    /// Create a new Delete activity.
    #[must_use]
    pub const fn new(
        id: Url,
        actor: Url,
        object: Url,
        audience: Url,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: DeleteType::Delete,
            id,
            actor,
            object,
            audience,
            published,
            remove: false,
            summary: None,
        }
    }

    /// Turn this into a moderator removal.
    #[must_use]
    pub fn removal(mut self, reason: Option<String>) -> Self {
        self.remove = true;
        self.summary = reason;
        self
    }
}
