//! Community entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fedsync_common::ObjectId;
use serde::{Deserialize, Serialize};

/// Community model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub ap_id: ObjectId,
    pub name: String,
    pub title: String,
    /// Whether this node is the community's home instance.
    pub local: bool,
    /// Moderators, local and remote.
    pub moderators: BTreeSet<ObjectId>,
    pub removed: bool,
    pub deleted: bool,
    pub published_at: DateTime<Utc>,
}

impl Model {
    /// Whether `person` moderates this community.
    #[must_use]
    pub fn is_moderator(&self, person: &ObjectId) -> bool {
        self.moderators.contains(person)
    }

    /// Whether new content may be posted.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !self.removed && !self.deleted
    }
}
