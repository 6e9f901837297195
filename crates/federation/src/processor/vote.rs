//! Votes.

use chrono::{DateTime, Utc};
use fedsync_common::AppResult;
use fedsync_core::check_not_banned;
use url::Url;

use super::{InboxOutcome, discard_on_policy, find_or_resolve_post};
use crate::activities::VoteActivity;
use crate::context::FederationContext;

/// Processor for Like, Dislike and their Undo.
#[derive(Clone)]
pub struct VoteProcessor {
    ctx: FederationContext,
}

impl VoteProcessor {
    /// Create a new vote processor.
    #[must_use]
    pub const fn new(ctx: FederationContext) -> Self {
        Self { ctx }
    }

    /// Record `score` (0 retracts) for the voter.
    pub async fn process(
        &self,
        vote: &VoteActivity,
        actor: &Url,
        score: i16,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        if &vote.actor != actor {
            return Ok(InboxOutcome::Discarded);
        }
        let voter = self.ctx.resolver.resolve_person(actor).await?;
        let post = find_or_resolve_post(&self.ctx, &vote.object).await?;
        let community = self
            .ctx
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;
        let banned = check_not_banned(&self.ctx.store, &voter, &community, Utc::now()).await;
        if let Some(outcome) = discard_on_policy(banned, actor)? {
            return Ok(outcome);
        }

        let existing = self.ctx.store.votes.find(&voter.ap_id, &post.ap_id).await?;
        if existing.map_or(0, |v| v.score) == score {
            return Ok(InboxOutcome::Stale);
        }
        let post = self.ctx.posts.record_vote(&post, &voter.ap_id, score, at).await?;
        tracing::debug!(actor = %voter.ap_id, object = %post.ap_id, score, total = post.score, "Recorded vote");
        Ok(InboxOutcome::Applied)
    }
}
