//! Announce activity.

use activitypub_federation::kinds::activity::AnnounceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::AnnouncableActivity;

/// A community relaying an activity to its followers.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceActivity {
    #[serde(rename = "type")]
    pub kind: AnnounceType,
    pub id: Url,
    /// The community.
    pub actor: Url,
    pub object: Box<AnnouncableActivity>,
    pub published: DateTime<Utc>,
}

impl AnnounceActivity {
    /// Create a new Announce activity.
    #[must_use]
    pub fn new(
        id: Url,
        actor: Url,
        object: AnnouncableActivity,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: AnnounceType::Announce,
            id,
            actor,
            object: Box::new(object),
            published,
        }
    }
}
