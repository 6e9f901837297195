//! Person entity.

use chrono::{DateTime, Utc};
use fedsync_common::{AppResult, InstanceId, ObjectId};
use serde::{Deserialize, Serialize};

use super::post::Facet;

/// Person model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub ap_id: ObjectId,
    pub name: String,
    /// Whether this node is the person's home instance.
    pub local: bool,
    /// Admin of the home instance.
    pub admin: bool,
    /// Banned by the home instance.
    pub banned: Facet,
    /// When the home instance ban expires.
    pub ban_expires_at: Option<DateTime<Utc>>,
    pub published_at: DateTime<Utc>,
}

impl Model {
    /// The person's home instance.
    pub fn home(&self) -> AppResult<InstanceId> {
        self.ap_id.instance()
    }

    /// Whether the home instance ban is in force at `now`.
    #[must_use]
    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned.value && self.ban_expires_at.is_none_or(|expires| expires > now)
    }
}
