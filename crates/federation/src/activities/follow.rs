//! Follow and Accept activities.

use activitypub_federation::kinds::activity::{AcceptType, FollowType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Follow a community.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowActivity {
    #[serde(rename = "type")]
    pub kind: FollowType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    pub published: DateTime<Utc>,
}

impl FollowActivity {
    /// Create a new Follow activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: Url, published: DateTime<Utc>) -> Self {
        Self {
            kind: FollowType::Follow,
            id,
            actor,
            object,
            published,
        }
    }
}

/// Accept a follow. Sent by the community.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptActivity {
    #[serde(rename = "type")]
    pub kind: AcceptType,
    pub id: Url,
    pub actor: Url,
    pub object: FollowActivity,
    pub published: DateTime<Utc>,
}
