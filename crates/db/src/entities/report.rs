//! Post report entity.

use chrono::{DateTime, Utc};
use fedsync_common::ObjectId;
use serde::{Deserialize, Serialize};
use url::Url;

use super::post::Facet;

/// Post report model.
///
/// Every holder keeps its own copy. The snapshot fields capture the post as it
/// was when the report was filed, so later edits do not change what
/// moderators see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub ap_id: ObjectId,
    /// Filed on this node.
    pub local: bool,
    pub post_id: ObjectId,
    pub community_id: ObjectId,
    /// Creator of the reported post.
    pub creator_id: ObjectId,
    pub reporter_id: ObjectId,
    pub reason: String,
    pub original_post_name: String,
    pub original_post_url: Option<Url>,
    pub original_post_body: Option<String>,
    pub published_at: DateTime<Utc>,
    pub resolved: Facet,
    pub resolver_id: Option<ObjectId>,
}

impl Model {
    /// Whether the report is resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved.value
    }
}
