//! Post moderation processor: lock, remove, delete.

use chrono::{DateTime, Utc};
use fedsync_common::AppResult;
use fedsync_core::{Capabilities, Capability, ModerationAction, resolve_capabilities};
use fedsync_db::entities::{Person, Post, RemovalSource};
use url::Url;

use super::{InboxOutcome, find_or_resolve_post};
use crate::activities::{DeleteActivity, LockPage};
use crate::context::FederationContext;

/// Processor for post-level moderation.
#[derive(Clone)]
pub struct ModerationProcessor {
    ctx: FederationContext,
}

impl ModerationProcessor {
    /// Create a new moderation processor.
    #[must_use]
    pub const fn new(ctx: FederationContext) -> Self {
        Self { ctx }
    }

    /// Delete (creator) or remove (moderator), or undo either.
    pub async fn process_delete(
        &self,
        delete: &DeleteActivity,
        actor: &Url,
        value: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        let (actor, post, caps) = self.context(actor, &delete.object).await?;
        let action = if delete.remove {
            ModerationAction::Remove {
                actor: actor.ap_id.clone(),
                post: post.ap_id.clone(),
                removed: value,
                source: if caps.has(Capability::CommunityMod) {
                    RemovalSource::Community
                } else {
                    RemovalSource::Site
                },
                reason: delete.summary.clone(),
                at,
            }
        } else {
            ModerationAction::Delete {
                actor: actor.ap_id.clone(),
                post: post.ap_id.clone(),
                deleted: value,
                at,
            }
        };
        self.apply(&action, &caps).await
    }

    /// Lock or unlock.
    pub async fn process_lock(
        &self,
        lock: &LockPage,
        actor: &Url,
        value: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        let (actor, post, caps) = self.context(actor, &lock.object).await?;
        let action = ModerationAction::Lock {
            actor: actor.ap_id.clone(),
            post: post.ap_id.clone(),
            locked: value,
            at,
        };
        self.apply(&action, &caps).await
    }

    /// Feature or unfeature.
    pub async fn process_feature(
        &self,
        actor: &Url,
        object: &Url,
        value: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        let (actor, post, caps) = self.context(actor, object).await?;
        let action = ModerationAction::Feature {
            actor: actor.ap_id.clone(),
            post: post.ap_id.clone(),
            featured: value,
            at,
        };
        self.apply(&action, &caps).await
    }

    async fn context(&self, actor: &Url, object: &Url) -> AppResult<(Person, Post, Capabilities)> {
        let actor = self.ctx.resolver.resolve_person(actor).await?;
        let post = find_or_resolve_post(&self.ctx, object).await?;
        let community = self
            .ctx
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;
        let caps = resolve_capabilities(&actor, Some(&post.creator_id), &community);
        Ok((actor, post, caps))
    }

    async fn apply(&self, action: &ModerationAction, caps: &Capabilities) -> AppResult<InboxOutcome> {
        let object = action
            .post_facet()
            .map(|(post, _, _)| post.clone())
            .unwrap_or_else(|| action.actor().clone());
        if !action.is_authorized(caps) {
            tracing::warn!(
                actor = %action.actor(),
                object = %object,
                capabilities = %caps,
                action = action.name(),
                "Discarded unauthorized moderation"
            );
            return Ok(InboxOutcome::Discarded);
        }

        let (post, outcome) = self.ctx.moderation.apply_post_action(action).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %action.actor(),
                object = %post.ap_id,
                action = action.name(),
                "Applied moderation"
            );
        } else {
            tracing::debug!(
                object = %post.ap_id,
                action = action.name(),
                "Stale moderation replay"
            );
        }
        Ok(outcome.into())
    }
}
