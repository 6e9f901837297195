//! Activity type names not covered by the standard vocabulary.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum CreateOrUpdateType {
    Create,
    Update,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum LockType {
    Lock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum ResolveType {
    Resolve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum VoteType {
    Like,
    Dislike,
}

impl VoteType {
    /// Score carried by this vote.
    #[must_use]
    pub const fn score(self) -> i16 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
        }
    }

    /// Vote type for a non-zero score.
    #[must_use]
    pub const fn from_score(score: i16) -> Self {
        if score < 0 { Self::Dislike } else { Self::Like }
    }
}
