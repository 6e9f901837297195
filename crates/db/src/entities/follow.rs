//! Community follow entity.

use chrono::{DateTime, Utc};
use fedsync_common::ObjectId;
use serde::{Deserialize, Serialize};

/// Follow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowState {
    /// Sent, not yet accepted by the community's home instance.
    Pending,
    /// Accepted.
    Accepted,
}

/// Follow model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub follower_id: ObjectId,
    pub community_id: ObjectId,
    pub state: FollowState,
    pub published_at: DateTime<Utc>,
}

impl Model {
    /// Whether the follow has been accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.state == FollowState::Accepted
    }
}
