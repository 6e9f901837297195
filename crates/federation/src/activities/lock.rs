//! Lock activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::kinds::LockType;

/// Lock a post. Undone by wrapping it in an Undo.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockPage {
    #[serde(rename = "type")]
    pub kind: LockType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    pub audience: Url,
    pub published: DateTime<Utc>,
}
