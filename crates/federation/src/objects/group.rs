//! Group object (a community).

use activitypub_federation::kinds::actor::GroupType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A community actor.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApGroup {
    #[serde(rename = "type")]
    pub kind: GroupType,
    pub id: Url,
    pub preferred_username: String,
    /// Display title.
    pub name: String,
    pub inbox: Url,

    /// Moderators, inline. Remote members included.
    #[serde(default)]
    pub moderators: Vec<Url>,

    pub featured: Url,

    #[serde(default)]
    pub removed: bool,

    #[serde(default)]
    pub deleted: bool,

    pub published: DateTime<Utc>,
}
