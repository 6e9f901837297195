//! Ban activity.

use activitypub_federation::kinds::activity::BlockType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Ban a person from a site or a community. Lifted by wrapping it in an Undo.
///
/// `target` is either the banning instance's base URL or a community id.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockUser {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    pub target: Url,
    pub published: DateTime<Utc>,

    #[serde(default)]
    pub remove_data: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}
