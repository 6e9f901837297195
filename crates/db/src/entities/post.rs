//! Post entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fedsync_common::{InstanceId, ObjectId};
use serde::{Deserialize, Serialize};
use url::Url;

/// A boolean moderation facet with the timestamp of the write that set it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    /// Current value.
    pub value: bool,
    /// Timestamp of the activity that produced `value`. `None` if never written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Facet {
    /// A facet written once at `at`.
    #[must_use]
    pub const fn set(value: bool, at: DateTime<Utc>) -> Self {
        Self {
            value,
            updated_at: Some(at),
        }
    }
}

/// Who removed a post through the removal facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalSource {
    /// A moderator of the owning community.
    Community,
    /// An admin of the community's home instance.
    Site,
}

/// Removal that only exists on this node and is never federated back.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "by")]
pub enum LocalRemoval {
    /// Creator banned by this instance (with content removal).
    SiteBan(InstanceId),
    /// Creator banned from the post's community (with content removal).
    CommunityBan(ObjectId),
    /// Removed by an admin of this node without authority over the community.
    Admin,
}

/// Link preview metadata carried with a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMetadata {
    /// Page title.
    pub title: Option<String>,
    /// Page description.
    pub description: Option<String>,
    /// Embedded video URL.
    pub video_url: Option<Url>,
}

/// Post model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Local key, assigned by the repository. Never federated.
    pub id: i64,
    /// Origin-qualified identifier.
    pub ap_id: ObjectId,
    /// Whether this node is the origin.
    pub local: bool,
    /// Title.
    pub name: String,
    /// Markdown body.
    pub body: Option<String>,
    /// Linked URL.
    pub url: Option<Url>,
    /// Not safe for work.
    pub nsfw: bool,
    /// Link preview metadata.
    pub embed: EmbedMetadata,
    /// Creator person.
    pub creator_id: ObjectId,
    /// Owning community.
    pub community_id: ObjectId,
    /// Creation time at the origin.
    pub published_at: DateTime<Utc>,
    /// Last content edit at the origin.
    pub updated_at: Option<DateTime<Utc>>,
    /// Locked facet.
    pub locked: Facet,
    /// Removed facet.
    pub removed: Facet,
    /// Authority behind the current removal facet.
    pub removed_by: Option<RemovalSource>,
    /// Deleted facet (tombstone).
    pub deleted: Facet,
    /// Featured in community facet.
    pub featured_community: Facet,
    /// Local-only removals layered over the federated facets.
    pub local_removals: BTreeSet<LocalRemoval>,
    /// Aggregated score of local vote records.
    pub score: i64,
}

impl Model {
    /// Effective removal as seen on this node.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.removed.value || !self.local_removals.is_empty()
    }

    /// Whether the post is tombstoned.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted.value
    }

    /// Whether the post is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked.value
    }

    /// Whether the post is featured in its community.
    #[must_use]
    pub const fn is_featured(&self) -> bool {
        self.featured_community.value
    }
}

/// Filter for listing posts.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Only posts by this creator.
    pub creator_id: Option<ObjectId>,
    /// Only posts in this community.
    pub community_id: Option<ObjectId>,
    /// Only posts whose community is hosted on this instance.
    pub community_instance: Option<InstanceId>,
    /// Only local (origin) posts.
    pub local_only: bool,
}

impl PostFilter {
    /// Whether a post passes the filter.
    #[must_use]
    pub fn matches(&self, post: &Model) -> bool {
        if self.local_only && !post.local {
            return false;
        }
        if let Some(ref creator) = self.creator_id
            && &post.creator_id != creator
        {
            return false;
        }
        if let Some(ref community) = self.community_id
            && &post.community_id != community
        {
            return false;
        }
        if let Some(ref instance) = self.community_instance
            && post.community_id.instance().ok().as_ref() != Some(instance)
        {
            return false;
        }
        true
    }
}
