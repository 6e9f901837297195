//! Activity types.
//!
//! The vocabulary is ActivityStreams-shaped JSON. Every activity carries
//! `published`, which is the timestamp last-writer-wins compares.

#![allow(missing_docs)]

mod announce;
mod block;
mod collection;
mod create_or_update;
mod delete;
mod follow;
pub mod kinds;
mod lock;
mod report;
mod undo;
mod vote;

pub use announce::AnnounceActivity;
pub use block::BlockUser;
pub use collection::{
    CollectionAdd, CollectionRemove, CollectionTarget, featured_url, moderators_url,
};
pub use create_or_update::CreateOrUpdatePage;
pub use delete::DeleteActivity;
pub use follow::{AcceptActivity, FollowActivity};
pub use kinds::{CreateOrUpdateType, LockType, ResolveType, VoteType};
pub use lock::LockPage;
pub use report::{ReportActivity, ResolveReport};
pub use undo::{UndoActivity, UndoObject};
pub use vote::VoteActivity;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Activities a community may relay to its followers.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AnnouncableActivity {
    CreateOrUpdate(CreateOrUpdatePage),
    Delete(DeleteActivity),
    Lock(LockPage),
    Add(CollectionAdd),
    Remove(CollectionRemove),
    Block(BlockUser),
    Vote(VoteActivity),
    Undo(UndoActivity),
}

impl AnnouncableActivity {
    /// Actor of the wrapped activity.
    #[must_use]
    pub const fn actor(&self) -> &Url {
        match self {
            Self::CreateOrUpdate(a) => &a.actor,
            Self::Delete(a) => &a.actor,
            Self::Lock(a) => &a.actor,
            Self::Add(a) => &a.actor,
            Self::Remove(a) => &a.actor,
            Self::Block(a) => &a.actor,
            Self::Vote(a) => &a.actor,
            Self::Undo(a) => &a.actor,
        }
    }

    /// Community whose content this activity touches.
    ///
    /// For a ban this is the ban target, which is the banning instance's base
    /// URL for a site ban.
    #[must_use]
    pub fn community(&self) -> Option<Url> {
        match self {
            Self::CreateOrUpdate(a) => Some(a.object.audience.clone()),
            Self::Delete(a) => Some(a.audience.clone()),
            Self::Lock(a) => Some(a.audience.clone()),
            Self::Vote(a) => Some(a.audience.clone()),
            Self::Add(a) => CollectionTarget::parse(&a.target).map(|t| t.community().clone()),
            Self::Remove(a) => CollectionTarget::parse(&a.target).map(|t| t.community().clone()),
            Self::Block(a) => Some(a.target.clone()),
            Self::Undo(a) => match &a.object {
                UndoObject::Lock(inner) => Some(inner.audience.clone()),
                UndoObject::Delete(inner) => Some(inner.audience.clone()),
                UndoObject::Vote(inner) => Some(inner.audience.clone()),
                UndoObject::Block(inner) => Some(inner.target.clone()),
                UndoObject::Follow(_) | UndoObject::Resolve(_) => None,
            },
        }
    }

    /// Key of the object whose state this activity mutates.
    #[must_use]
    pub fn lock_key(&self) -> &str {
        match self {
            Self::CreateOrUpdate(a) => a.object.id.as_str(),
            Self::Delete(a) => a.object.as_str(),
            Self::Lock(a) => a.object.as_str(),
            Self::Vote(a) => a.object.as_str(),
            Self::Add(a) => collection_lock_key(&a.target, &a.object),
            Self::Remove(a) => collection_lock_key(&a.target, &a.object),
            Self::Block(a) => a.object.as_str(),
            Self::Undo(a) => match &a.object {
                UndoObject::Lock(inner) => inner.object.as_str(),
                UndoObject::Delete(inner) => inner.object.as_str(),
                UndoObject::Vote(inner) => inner.object.as_str(),
                UndoObject::Block(inner) => inner.object.as_str(),
                UndoObject::Follow(inner) => inner.object.as_str(),
                UndoObject::Resolve(inner) => inner.object.id.as_str(),
            },
        }
    }

    /// Activity id.
    #[must_use]
    pub const fn id(&self) -> &Url {
        match self {
            Self::CreateOrUpdate(a) => &a.id,
            Self::Delete(a) => &a.id,
            Self::Lock(a) => &a.id,
            Self::Add(a) => &a.id,
            Self::Remove(a) => &a.id,
            Self::Block(a) => &a.id,
            Self::Vote(a) => &a.id,
            Self::Undo(a) => &a.id,
        }
    }
}

/// Featured changes lock the post; moderator changes lock the collection.
fn collection_lock_key<'a>(target: &'a Url, object: &'a Url) -> &'a str {
    match CollectionTarget::parse(target) {
        Some(CollectionTarget::Featured(_)) => object.as_str(),
        _ => target.as_str(),
    }
}

/// Any activity accepted by the inbox.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InboxActivity {
    Announce(AnnounceActivity),
    Announcable(AnnouncableActivity),
    Report(ReportActivity),
    Resolve(ResolveReport),
    Follow(FollowActivity),
    Accept(AcceptActivity),
    Unknown(Value),
}

impl InboxActivity {
    /// Get the activity type as a string.
    #[must_use]
    pub const fn activity_type(&self) -> &'static str {
        match self {
            Self::Announce(_) => "Announce",
            Self::Announcable(a) => match a {
                AnnouncableActivity::CreateOrUpdate(_) => "CreateOrUpdate",
                AnnouncableActivity::Delete(_) => "Delete",
                AnnouncableActivity::Lock(_) => "Lock",
                AnnouncableActivity::Add(_) => "Add",
                AnnouncableActivity::Remove(_) => "Remove",
                AnnouncableActivity::Block(_) => "Block",
                AnnouncableActivity::Vote(_) => "Vote",
                AnnouncableActivity::Undo(_) => "Undo",
            },
            Self::Report(_) => "Flag",
            Self::Resolve(_) => "Resolve",
            Self::Follow(_) => "Follow",
            Self::Accept(_) => "Accept",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Get the actor URL.
    #[must_use]
    pub const fn actor(&self) -> Option<&Url> {
        match self {
            Self::Announce(a) => Some(&a.actor),
            Self::Announcable(a) => Some(a.actor()),
            Self::Report(a) => Some(&a.actor),
            Self::Resolve(a) => Some(&a.actor),
            Self::Follow(a) => Some(&a.actor),
            Self::Accept(a) => Some(&a.actor),
            Self::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_untagged_dispatch_by_type() {
        let lock = json!({
            "type": "Lock",
            "id": "https://alpha.example/activities/lock/1",
            "actor": "https://alpha.example/u/mod",
            "object": "https://alpha.example/post/1",
            "audience": "https://alpha.example/c/main",
            "published": Utc::now(),
        });
        let parsed: InboxActivity = serde_json::from_value(lock.clone()).unwrap();
        assert_eq!(parsed.activity_type(), "Lock");

        let undo = json!({
            "type": "Undo",
            "id": "https://alpha.example/activities/undo/1",
            "actor": "https://alpha.example/u/mod",
            "object": lock,
            "published": Utc::now(),
        });
        let parsed: InboxActivity = serde_json::from_value(undo).unwrap();
        match parsed {
            InboxActivity::Announcable(AnnouncableActivity::Undo(undo)) => {
                assert!(matches!(undo.object, UndoObject::Lock(_)));
            }
            other => panic!("unexpected {}", other.activity_type()),
        }

        let unknown: InboxActivity =
            serde_json::from_value(json!({"type": "Move", "id": "x"})).unwrap();
        assert_eq!(unknown.activity_type(), "Unknown");
        assert!(unknown.actor().is_none());
    }

    #[test]
    fn test_delete_removal_flag_defaults_false() {
        let delete: DeleteActivity = serde_json::from_value(json!({
            "type": "Delete",
            "id": "https://alpha.example/activities/delete/1",
            "actor": "https://alpha.example/u/alice",
            "object": "https://alpha.example/post/1",
            "audience": "https://alpha.example/c/main",
            "published": Utc::now(),
        }))
        .unwrap();
        assert!(!delete.remove);
    }
}
