//! Local site policy state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fedsync_common::InstanceId;
use serde::{Deserialize, Serialize};

/// Policy of this node, mutated by its admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// This node.
    pub instance: InstanceId,
    /// Domain patterns of instances this node blocks.
    pub blocked_instances: BTreeSet<String>,
    /// URL patterns rejected on local creation.
    pub blocked_urls: Vec<String>,
    pub disallow_nsfw_content: bool,
    pub updated_at: DateTime<Utc>,
}
