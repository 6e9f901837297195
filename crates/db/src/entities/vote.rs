//! Post vote entity.

use chrono::{DateTime, Utc};
use fedsync_common::ObjectId;
use serde::{Deserialize, Serialize};

/// Vote model. `score` is `1` or `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub person_id: ObjectId,
    pub post_id: ObjectId,
    pub score: i16,
    pub published_at: DateTime<Utc>,
}
