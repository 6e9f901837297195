//! Outbound announcement seam.
//!
//! Services describe what changed locally; the federation crate turns each
//! [`Announcement`] into an activity and hands it to the delivery queue.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedsync_common::{AppResult, ObjectId};
use fedsync_db::entities::{Community, Post, Report};

use crate::facets::ModerationAction;

/// A local mutation to federate.
#[derive(Debug, Clone)]
pub enum Announcement {
    /// A post was created here.
    CreatePost { post: Post },
    /// A post's content was edited here.
    UpdatePost { post: Post },
    /// A moderation action was taken here. `post` is set for post-level actions.
    Moderation {
        action: ModerationAction,
        post: Option<Post>,
    },
    /// A vote was cast (`score` 1 or -1) or retracted (`score` 0).
    Vote {
        actor: ObjectId,
        post: Post,
        score: i16,
        at: DateTime<Utc>,
    },
    /// A moderator was added to or removed from a community.
    Moderator {
        actor: ObjectId,
        community: Community,
        moderator: ObjectId,
        added: bool,
        at: DateTime<Utc>,
    },
    /// A report was filed here.
    Report { report: Report },
    /// A report was resolved (or reopened) here.
    ResolveReport {
        actor: ObjectId,
        report: Report,
        resolved: bool,
        at: DateTime<Utc>,
    },
    /// A local person followed (or unfollowed) a remote community.
    Follow {
        follower: ObjectId,
        community: ObjectId,
        follow: bool,
    },
    /// A local community accepted a remote follower.
    AcceptFollow {
        follower: ObjectId,
        community: ObjectId,
    },
}

impl Announcement {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreatePost { .. } => "create_post",
            Self::UpdatePost { .. } => "update_post",
            Self::Moderation { action, .. } => action.name(),
            Self::Vote { .. } => "vote",
            Self::Moderator { .. } => "moderator",
            Self::Report { .. } => "report",
            Self::ResolveReport { .. } => "resolve_report",
            Self::Follow { .. } => "follow",
            Self::AcceptFollow { .. } => "accept_follow",
        }
    }
}

/// Trait for federating local mutations.
///
/// Implementations must not block on delivery: they enqueue and return.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Queue the activities for one local mutation.
    async fn announce(&self, announcement: Announcement) -> AppResult<()>;
}

/// A no-op announcer for testing or when federation is disabled.
#[derive(Clone, Default)]
pub struct NoOpAnnouncer;

#[async_trait]
impl Announcer for NoOpAnnouncer {
    async fn announce(&self, _announcement: Announcement) -> AppResult<()> {
        Ok(())
    }
}

/// Shared announcer handle.
pub type AnnouncerService = Arc<dyn Announcer>;

/// Announce and log instead of failing the local mutation.
pub(crate) async fn announce_or_warn(announcer: &AnnouncerService, announcement: Announcement) {
    let name = announcement.name();
    if let Err(e) = announcer.announce(announcement).await {
        tracing::warn!(error = %e, announcement = name, "Failed to queue announcement");
    }
}
