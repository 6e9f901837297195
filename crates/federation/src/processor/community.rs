//! Community collections and follows.

use chrono::{DateTime, Utc};
use fedsync_common::{AppResult, ObjectId};
use fedsync_core::resolve_capabilities;
use url::Url;

use super::{InboxOutcome, ModerationProcessor};
use crate::activities::{AcceptActivity, CollectionTarget, FollowActivity};
use crate::context::FederationContext;

/// Processor for featured posts, moderator lists and follows.
#[derive(Clone)]
pub struct CommunityProcessor {
    ctx: FederationContext,
    moderation: ModerationProcessor,
}

impl CommunityProcessor {
    /// Create a new community processor.
    #[must_use]
    pub fn new(ctx: FederationContext) -> Self {
        Self {
            moderation: ModerationProcessor::new(ctx.clone()),
            ctx,
        }
    }

    /// Add to or remove from a community collection.
    pub async fn process_collection(
        &self,
        actor: &Url,
        target: &Url,
        object: &Url,
        added: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        match CollectionTarget::parse(target) {
            Some(CollectionTarget::Featured(_)) => {
                self.moderation.process_feature(actor, object, added, at).await
            }
            Some(CollectionTarget::Moderators(community)) => {
                self.process_moderator(actor, &community, object, added).await
            }
            None => {
                tracing::debug!(target = %target, "Unknown collection");
                Ok(InboxOutcome::Discarded)
            }
        }
    }

    async fn process_moderator(
        &self,
        actor: &Url,
        community: &Url,
        moderator: &Url,
        added: bool,
    ) -> AppResult<InboxOutcome> {
        let actor = self.ctx.resolver.resolve_person(actor).await?;
        let community = self.ctx.resolver.resolve_community(community).await?;
        let caps = resolve_capabilities(&actor, None, &community);
        if !caps.can_moderate() {
            tracing::warn!(
                actor = %actor.ap_id,
                community = %community.ap_id,
                capabilities = %caps,
                "Discarded unauthorized moderator change"
            );
            return Ok(InboxOutcome::Discarded);
        }
        let moderator = self.ctx.resolver.resolve_person(moderator).await?;

        let (community, changed) = self
            .ctx
            .moderation
            .apply_moderator(&community, &moderator.ap_id, added)
            .await?;
        if !changed {
            return Ok(InboxOutcome::Stale);
        }
        tracing::info!(
            actor = %actor.ap_id,
            community = %community.ap_id,
            moderator = %moderator.ap_id,
            added,
            "Applied moderator change"
        );
        Ok(InboxOutcome::Applied)
    }

    /// A remote person follows a community hosted here.
    pub async fn process_follow(&self, follow: &FollowActivity) -> AppResult<InboxOutcome> {
        let community = self
            .ctx
            .store
            .communities
            .find_by_ap_id(&ObjectId::new(follow.object.clone()))
            .await?;
        let Some(community) = community.filter(|c| c.local) else {
            tracing::debug!(object = %follow.object, "Follow for a community not hosted here");
            return Ok(InboxOutcome::Discarded);
        };
        let follower = self.ctx.resolver.resolve_person(&follow.actor).await?;
        self.ctx.following.receive_follow(&follower, &community).await?;
        tracing::info!(actor = %follower.ap_id, community = %community.ap_id, "Accepted follower");
        Ok(InboxOutcome::Applied)
    }

    /// A remote follower leaves.
    pub async fn process_unfollow(
        &self,
        follow: &FollowActivity,
        undo_actor: &Url,
    ) -> AppResult<InboxOutcome> {
        if &follow.actor != undo_actor {
            return Ok(InboxOutcome::Discarded);
        }
        let removed = self
            .ctx
            .following
            .receive_unfollow(
                &ObjectId::new(follow.actor.clone()),
                &ObjectId::new(follow.object.clone()),
            )
            .await?;
        Ok(if removed {
            InboxOutcome::Applied
        } else {
            InboxOutcome::Stale
        })
    }

    /// A community accepted one of our follows.
    pub async fn process_accept(&self, accept: &AcceptActivity) -> AppResult<InboxOutcome> {
        if accept.actor != accept.object.object {
            tracing::warn!(
                actor = %accept.actor,
                object = %accept.object.object,
                "Accept not sent by the followed community"
            );
            return Ok(InboxOutcome::Discarded);
        }
        let accepted = self
            .ctx
            .following
            .receive_accept(
                &ObjectId::new(accept.object.actor.clone()),
                &ObjectId::new(accept.object.object.clone()),
            )
            .await?;
        Ok(match accepted {
            Some(follow) => {
                tracing::info!(
                    actor = %follow.follower_id,
                    community = %follow.community_id,
                    "Follow accepted"
                );
                InboxOutcome::Applied
            }
            None => InboxOutcome::Stale,
        })
    }
}
