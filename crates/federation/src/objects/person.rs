//! Person object.

use activitypub_federation::kinds::actor::PersonType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A person actor.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApPerson {
    #[serde(rename = "type")]
    pub kind: PersonType,
    pub id: Url,
    pub preferred_username: String,
    pub inbox: Url,

    /// Admin of its home instance.
    #[serde(default)]
    pub admin: bool,

    pub published: DateTime<Utc>,
}
