//! Undo activity.

use activitypub_federation::kinds::activity::UndoType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{BlockUser, DeleteActivity, FollowActivity, LockPage, ResolveReport, VoteActivity};

/// Activities that can be undone.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UndoObject {
    Lock(LockPage),
    Delete(DeleteActivity),
    Block(BlockUser),
    Vote(VoteActivity),
    Follow(FollowActivity),
    Resolve(ResolveReport),
}

impl UndoObject {
    /// Actor of the undone activity.
    #[must_use]
    pub const fn actor(&self) -> &Url {
        match self {
            Self::Lock(a) => &a.actor,
            Self::Delete(a) => &a.actor,
            Self::Block(a) => &a.actor,
            Self::Vote(a) => &a.actor,
            Self::Follow(a) => &a.actor,
            Self::Resolve(a) => &a.actor,
        }
    }
}

/// Undo a previous activity, embedded in full.
///
/// `published` is the time of the undo and is what last-writer-wins compares.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoActivity {
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
    pub actor: Url,
    pub object: UndoObject,
    pub published: DateTime<Utc>,
}

impl UndoActivity {
    /// Create a new Undo activity.
    #[must_use]
    pub const fn new(id: Url, actor: Url, object: UndoObject, published: DateTime<Utc>) -> Self {
        Self {
            kind: UndoType::Undo,
            id,
            actor,
            object,
            published,
        }
    }
}
