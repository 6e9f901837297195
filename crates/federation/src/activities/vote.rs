//! Vote activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::kinds::VoteType;

/// Upvote (Like) or downvote (Dislike) a post. Retracted by an Undo.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteActivity {
    #[serde(rename = "type")]
    pub kind: VoteType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    pub audience: Url,
    pub published: DateTime<Utc>,
}
