//! Create/Update processor.

use chrono::Utc;
use fedsync_common::AppResult;
use fedsync_core::check_not_banned;

use super::{InboxOutcome, discard_on_policy, same_origin};
use crate::activities::{CreateOrUpdatePage, CreateOrUpdateType};
use crate::context::FederationContext;
use crate::convert::{ApPageExt, rewrite_post_links};

/// Processor for Create and Update of posts.
#[derive(Clone)]
pub struct PageProcessor {
    ctx: FederationContext,
}

impl PageProcessor {
    /// Create a new page processor.
    #[must_use]
    pub const fn new(ctx: FederationContext) -> Self {
        Self { ctx }
    }

    /// Insert or refresh the mirror of a post.
    ///
    /// Only the creator may write a post's content, and the post must live on
    /// the creator's instance. NSFW posts are stored even where NSFW is
    /// disallowed; local visibility hides them.
    pub async fn process(&self, activity: &CreateOrUpdatePage) -> AppResult<InboxOutcome> {
        let page = &activity.object;
        if page.attributed_to != activity.actor || !same_origin(&page.id, &activity.actor)? {
            tracing::warn!(
                actor = %activity.actor,
                object = %page.id,
                "Page content not sent by its creator"
            );
            return Ok(InboxOutcome::Discarded);
        }

        let creator = self.ctx.resolver.resolve_person(&page.attributed_to).await?;
        let community = self.ctx.resolver.resolve_community(&page.audience).await?;
        if !community.is_open() {
            tracing::debug!(community = %community.ap_id, "Dropping post in closed community");
            return Ok(InboxOutcome::Discarded);
        }
        let banned = check_not_banned(&self.ctx.store, &creator, &community, Utc::now()).await;
        if let Some(outcome) = discard_on_policy(banned, &activity.actor)? {
            return Ok(outcome);
        }

        let mut page = page.clone();
        if let Some(content) = page.content.take() {
            page.content = Some(
                rewrite_post_links(&content, &self.ctx.store.posts, &self.ctx.base_url).await?,
            );
        }
        let (post, outcome) = self.ctx.posts.upsert_mirror(page.to_post()?).await?;

        if outcome.is_applied() {
            tracing::info!(
                actor = %activity.actor,
                object = %post.ap_id,
                activity_id = %activity.id,
                update = activity.kind == CreateOrUpdateType::Update,
                "Stored post"
            );
        } else {
            tracing::debug!(object = %post.ap_id, activity_id = %activity.id, "Stale post replay");
        }
        Ok(outcome.into())
    }
}
