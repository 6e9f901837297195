//! Report (Flag) and report resolution activities.

use activitypub_federation::kinds::activity::FlagType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::kinds::ResolveType;

/// Report of a post. The activity id doubles as the report's identifier on
/// every holder.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportActivity {
    #[serde(rename = "type")]
    pub kind: FlagType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
    /// Community of the reported post.
    pub audience: Url,
    /// Creator of the reported post.
    pub attributed_to: Url,
    /// Reason.
    pub summary: String,
    pub original_post_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_post_body: Option<String>,
    pub published: DateTime<Utc>,
}

/// Resolution of a report. Reopened by wrapping it in an Undo.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    #[serde(rename = "type")]
    pub kind: ResolveType,
    pub id: Url,
    pub actor: Url,
    pub object: ReportActivity,
    pub published: DateTime<Utc>,
}
