//! Moderation facets of a post.
//!
//! Locked, removed, deleted and featured are independent. Each facet is a
//! last-writer-wins register keyed by the timestamp of the activity that wrote
//! it. Equal timestamps resolve to `true`, so every node picks the same winner
//! regardless of arrival order.

use chrono::{DateTime, Utc};
use fedsync_common::{InstanceId, ObjectId};
use fedsync_db::entities::{Facet, Post, RemovalSource};

use crate::authority::Capabilities;

/// Result of writing a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetOutcome {
    /// The write won.
    Applied,
    /// An equal or newer write is already in place.
    Stale,
}

impl FacetOutcome {
    /// Whether the write won.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Write `value` at `at` into `facet`.
pub fn write_facet(facet: &mut Facet, value: bool, at: DateTime<Utc>) -> FacetOutcome {
    let wins = match facet.updated_at {
        None => true,
        Some(current) if at > current => true,
        Some(current) if at == current => value && !facet.value,
        Some(_) => false,
    };
    if wins {
        *facet = Facet::set(value, at);
        FacetOutcome::Applied
    } else {
        FacetOutcome::Stale
    }
}

/// Which facet a post action targets.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Locked,
    Removed,
    Deleted,
    Featured,
}

/// A moderation action as applied by any node.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    Lock {
        actor: ObjectId,
        post: ObjectId,
        locked: bool,
        at: DateTime<Utc>,
    },
    Remove {
        actor: ObjectId,
        post: ObjectId,
        removed: bool,
        source: RemovalSource,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    Delete {
        actor: ObjectId,
        post: ObjectId,
        deleted: bool,
        at: DateTime<Utc>,
    },
    Feature {
        actor: ObjectId,
        post: ObjectId,
        featured: bool,
        at: DateTime<Utc>,
    },
    BanFromSite {
        actor: ObjectId,
        person: ObjectId,
        /// Instance issuing the ban.
        instance: InstanceId,
        banned: bool,
        remove_data: bool,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
    BanFromCommunity {
        actor: ObjectId,
        person: ObjectId,
        community: ObjectId,
        banned: bool,
        remove_data: bool,
        reason: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    },
}

impl ModerationAction {
    /// Acting person.
    #[must_use]
    pub const fn actor(&self) -> &ObjectId {
        match self {
            Self::Lock { actor, .. }
            | Self::Remove { actor, .. }
            | Self::Delete { actor, .. }
            | Self::Feature { actor, .. }
            | Self::BanFromSite { actor, .. }
            | Self::BanFromCommunity { actor, .. } => actor,
        }
    }

    /// Timestamp of the action.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Lock { at, .. }
            | Self::Remove { at, .. }
            | Self::Delete { at, .. }
            | Self::Feature { at, .. }
            | Self::BanFromSite { at, .. }
            | Self::BanFromCommunity { at, .. } => *at,
        }
    }

    /// Target post and the facet written, for post-level actions.
    #[must_use]
    pub fn post_facet(&self) -> Option<(&ObjectId, FacetKind, bool)> {
        match self {
            Self::Lock { post, locked, .. } => Some((post, FacetKind::Locked, *locked)),
            Self::Remove { post, removed, .. } => Some((post, FacetKind::Removed, *removed)),
            Self::Delete { post, deleted, .. } => Some((post, FacetKind::Deleted, *deleted)),
            Self::Feature { post, featured, .. } => Some((post, FacetKind::Featured, *featured)),
            Self::BanFromSite { .. } | Self::BanFromCommunity { .. } => None,
        }
    }

    /// Whether `caps` authorize this action.
    ///
    /// Delete belongs to the creator and the admins of the creator's home
    /// instance. Everything else needs a community
    /// moderator or an admin of the community's home instance. Site bans are
    /// authorized by instance admin status, checked by the caller.
    #[must_use]
    pub fn is_authorized(&self, caps: &Capabilities) -> bool {
        match self {
            Self::Delete { .. } => caps.is_owner(),
            Self::Lock { .. }
            | Self::Remove { .. }
            | Self::Feature { .. }
            | Self::BanFromCommunity { .. } => caps.can_moderate(),
            Self::BanFromSite { .. } => false,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lock { .. } => "lock",
            Self::Remove { .. } => "remove",
            Self::Delete { .. } => "delete",
            Self::Feature { .. } => "feature",
            Self::BanFromSite { .. } => "ban_from_site",
            Self::BanFromCommunity { .. } => "ban_from_community",
        }
    }
}

/// Apply a post-level action to `post`. Ban actions are no-ops here.
pub fn apply_to_post(post: &mut Post, action: &ModerationAction) -> FacetOutcome {
    let at = action.at();
    match action {
        ModerationAction::Lock { locked, .. } => write_facet(&mut post.locked, *locked, at),
        ModerationAction::Delete { deleted, .. } => write_facet(&mut post.deleted, *deleted, at),
        ModerationAction::Feature { featured, .. } => {
            write_facet(&mut post.featured_community, *featured, at)
        }
        ModerationAction::Remove {
            removed, source, ..
        } => {
            let outcome = write_facet(&mut post.removed, *removed, at);
            if outcome.is_applied() {
                post.removed_by = removed.then_some(*source);
            }
            outcome
        }
        ModerationAction::BanFromSite { .. } | ModerationAction::BanFromCommunity { .. } => {
            FacetOutcome::Stale
        }
    }
}
