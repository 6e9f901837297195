//! Inbound activity processing.
//!
//! Every activity goes through the same gate: the verified actor must be the
//! activity's actor, and nothing from a blocked instance gets further. Each
//! processor then resolves what it touches, checks authority and applies the
//! change through last-writer-wins. Failures are logged and swallowed; the
//! sending node never learns why an activity was dropped.

mod ban;
mod community;
mod moderation;
mod page;
mod report;
mod vote;

pub use ban::BanProcessor;
pub use community::CommunityProcessor;
pub use moderation::ModerationProcessor;
pub use page::PageProcessor;
pub use report::ReportProcessor;
pub use vote::VoteProcessor;

use fedsync_common::{AppError, AppResult, InstanceId, ObjectId};
use fedsync_core::FacetOutcome;
use fedsync_db::entities::Post;
use url::Url;

use crate::activities::{AnnouncableActivity, AnnounceActivity, InboxActivity, UndoObject};
use crate::context::FederationContext;

/// What became of an inbound activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxOutcome {
    /// State changed.
    Applied,
    /// Replay or older than what is held; nothing changed.
    Stale,
    /// Dropped: unauthorized, blocked, unresolvable or malformed.
    Discarded,
}

impl From<FacetOutcome> for InboxOutcome {
    fn from(outcome: FacetOutcome) -> Self {
        match outcome {
            FacetOutcome::Applied => Self::Applied,
            FacetOutcome::Stale => Self::Stale,
        }
    }
}

/// Entry point for activities delivered to this node.
#[derive(Clone)]
pub struct InboxProcessor {
    ctx: FederationContext,
    pages: PageProcessor,
    moderation: ModerationProcessor,
    bans: BanProcessor,
    community: CommunityProcessor,
    votes: VoteProcessor,
    reports: ReportProcessor,
}

impl InboxProcessor {
    /// Create a new inbox processor.
    #[must_use]
    pub fn new(ctx: FederationContext) -> Self {
        Self {
            pages: PageProcessor::new(ctx.clone()),
            moderation: ModerationProcessor::new(ctx.clone()),
            bans: BanProcessor::new(ctx.clone()),
            community: CommunityProcessor::new(ctx.clone()),
            votes: VoteProcessor::new(ctx.clone()),
            reports: ReportProcessor::new(ctx.clone()),
            ctx,
        }
    }

    /// Process an activity asserted by `verified_actor`.
    pub async fn receive(&self, verified_actor: &Url, activity: InboxActivity) -> InboxOutcome {
        let kind = activity.activity_type();
        match self.dispatch(verified_actor, activity).await {
            Ok(outcome) => {
                tracing::debug!(actor = %verified_actor, activity = kind, ?outcome, "Processed activity");
                outcome
            }
            Err(e) => {
                tracing::warn!(
                    actor = %verified_actor,
                    activity = kind,
                    error = %e,
                    "Discarded activity"
                );
                InboxOutcome::Discarded
            }
        }
    }

    async fn dispatch(
        &self,
        verified_actor: &Url,
        activity: InboxActivity,
    ) -> AppResult<InboxOutcome> {
        let Some(actor) = activity.actor() else {
            tracing::debug!(actor = %verified_actor, "Ignoring unsupported activity");
            return Ok(InboxOutcome::Discarded);
        };
        if actor != verified_actor {
            tracing::warn!(
                actor = %verified_actor,
                claimed = %actor,
                "Activity actor does not match verified actor"
            );
            return Ok(InboxOutcome::Discarded);
        }
        let sender = InstanceId::from_url(verified_actor)?;
        if self.ctx.policy.is_blocked_instance(&sender).await? {
            tracing::debug!(instance = %sender, "Dropping activity from blocked instance");
            return Ok(InboxOutcome::Discarded);
        }

        match activity {
            InboxActivity::Announce(announce) => self.receive_announce(announce, &sender).await,
            InboxActivity::Announcable(inner) => {
                self.receive_announcable(inner, &sender, false).await
            }
            InboxActivity::Report(report) => {
                let _guard = self.ctx.locks.lock(report.id.as_str()).await;
                self.reports.process_report(&report).await
            }
            InboxActivity::Resolve(resolve) => {
                let _guard = self.ctx.locks.lock(resolve.object.id.as_str()).await;
                self.reports
                    .process_resolve(&resolve, &resolve.actor, true, resolve.published)
                    .await
            }
            InboxActivity::Follow(follow) => {
                let _guard = self.ctx.locks.lock(follow.object.as_str()).await;
                self.community.process_follow(&follow).await
            }
            InboxActivity::Accept(accept) => {
                let _guard = self.ctx.locks.lock(accept.actor.as_str()).await;
                self.community.process_accept(&accept).await
            }
            InboxActivity::Unknown(_) => Ok(InboxOutcome::Discarded),
        }
    }

    /// Unwrap an Announce, accepting it only from the community it concerns.
    async fn receive_announce(
        &self,
        announce: AnnounceActivity,
        sender: &InstanceId,
    ) -> AppResult<InboxOutcome> {
        let inner = *announce.object;
        if inner.community().as_ref() != Some(&announce.actor) {
            tracing::warn!(
                actor = %announce.actor,
                activity_id = %inner.id(),
                "Announce not sent by the community of its object"
            );
            return Ok(InboxOutcome::Discarded);
        }
        let inner_origin = InstanceId::from_url(inner.actor())?;
        if self.ctx.policy.is_blocked_instance(&inner_origin).await? {
            tracing::debug!(instance = %inner_origin, "Dropping announced activity from blocked instance");
            return Ok(InboxOutcome::Discarded);
        }
        self.receive_announcable(inner, sender, true).await
    }

    async fn receive_announcable(
        &self,
        activity: AnnouncableActivity,
        sender: &InstanceId,
        announced: bool,
    ) -> AppResult<InboxOutcome> {
        let outcome = {
            let _guard = self.ctx.locks.lock(activity.lock_key()).await;
            self.apply_announcable(&activity).await?
        };

        if outcome == InboxOutcome::Applied && !announced {
            self.relay_if_home(activity, sender).await;
        }
        Ok(outcome)
    }

    async fn apply_announcable(&self, activity: &AnnouncableActivity) -> AppResult<InboxOutcome> {
        match activity {
            AnnouncableActivity::CreateOrUpdate(create) => self.pages.process(create).await,
            AnnouncableActivity::Delete(delete) => {
                self.moderation
                    .process_delete(delete, &delete.actor, true, delete.published)
                    .await
            }
            AnnouncableActivity::Lock(lock) => {
                self.moderation
                    .process_lock(lock, &lock.actor, true, lock.published)
                    .await
            }
            AnnouncableActivity::Add(add) => {
                self.community
                    .process_collection(&add.actor, &add.target, &add.object, true, add.published)
                    .await
            }
            AnnouncableActivity::Remove(remove) => {
                self.community
                    .process_collection(
                        &remove.actor,
                        &remove.target,
                        &remove.object,
                        false,
                        remove.published,
                    )
                    .await
            }
            AnnouncableActivity::Block(block) => {
                self.bans
                    .process(block, &block.actor, true, block.published)
                    .await
            }
            AnnouncableActivity::Vote(vote) => {
                self.votes
                    .process(vote, &vote.actor, vote.kind.score(), vote.published)
                    .await
            }
            AnnouncableActivity::Undo(undo) => {
                let at = undo.published;
                match &undo.object {
                    UndoObject::Lock(lock) => {
                        self.moderation
                            .process_lock(lock, &undo.actor, false, at)
                            .await
                    }
                    UndoObject::Delete(delete) => {
                        self.moderation
                            .process_delete(delete, &undo.actor, false, at)
                            .await
                    }
                    UndoObject::Block(block) => {
                        self.bans.process(block, &undo.actor, false, at).await
                    }
                    UndoObject::Vote(vote) => {
                        self.votes.process(vote, &undo.actor, 0, at).await
                    }
                    UndoObject::Follow(follow) => {
                        self.community.process_unfollow(follow, &undo.actor).await
                    }
                    UndoObject::Resolve(resolve) => {
                        self.reports
                            .process_resolve(resolve, &undo.actor, false, at)
                            .await
                    }
                }
            }
        }
    }

    /// Re-announce to followers when this node hosts the community.
    async fn relay_if_home(&self, activity: AnnouncableActivity, sender: &InstanceId) {
        let Some(community_url) = activity.community() else {
            return;
        };
        let community = match self
            .ctx
            .store
            .communities
            .find_by_ap_id(&ObjectId::new(community_url))
            .await
        {
            Ok(Some(community)) if community.local => community,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "Community lookup for relay failed");
                return;
            }
        };
        if let Err(e) = self.ctx.outbound.relay(&community, activity, sender).await {
            tracing::warn!(community = %community.ap_id, error = %e, "Relay failed");
        }
    }
}

/// Find a post locally, or resolve it from its origin.
pub(crate) async fn find_or_resolve_post(ctx: &FederationContext, url: &Url) -> AppResult<Post> {
    if let Some(post) = ctx
        .store
        .posts
        .find_by_ap_id(&ObjectId::new(url.clone()))
        .await?
    {
        return Ok(post);
    }
    ctx.resolver.resolve_post(url).await
}

/// Discard helper: an activity whose claimed origin does not match.
pub(crate) fn same_origin(a: &Url, b: &Url) -> AppResult<bool> {
    Ok(InstanceId::from_url(a)? == InstanceId::from_url(b)?)
}

/// Map an error from a policy check to a discard, propagating everything else.
pub(crate) fn discard_on_policy(result: AppResult<()>, actor: &Url) -> AppResult<Option<InboxOutcome>> {
    match result {
        Ok(()) => Ok(None),
        Err(AppError::PolicyRejected(violation)) => {
            tracing::warn!(actor = %actor, %violation, "Discarded activity violating local policy");
            Ok(Some(InboxOutcome::Discarded))
        }
        Err(e) => Err(e),
    }
}
