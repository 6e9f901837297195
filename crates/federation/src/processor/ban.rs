//! Site and community bans.

use chrono::{DateTime, Utc};
use fedsync_common::{AppResult, InstanceId};
use fedsync_core::{ModerationAction, resolve_capabilities};
use url::Url;

use super::InboxOutcome;
use crate::activities::BlockUser;
use crate::context::FederationContext;

/// Processor for Block and Undo Block.
#[derive(Clone)]
pub struct BanProcessor {
    ctx: FederationContext,
}

impl BanProcessor {
    /// Create a new ban processor.
    #[must_use]
    pub const fn new(ctx: FederationContext) -> Self {
        Self { ctx }
    }

    /// Apply a ban (`banned`) or its reversal.
    ///
    /// A block whose target is an instance root is a site ban and needs an
    /// admin of that instance. Anything else targets a community.
    pub async fn process(
        &self,
        block: &BlockUser,
        actor: &Url,
        banned: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        let actor = self.ctx.resolver.resolve_person(actor).await?;
        let target_instance = InstanceId::from_url(&block.target)?;

        let action = if block.target == target_instance.base_url()? {
            if !actor.admin || actor.home()? != target_instance {
                tracing::warn!(
                    actor = %actor.ap_id,
                    instance = %target_instance,
                    "Discarded site ban from non-admin"
                );
                return Ok(InboxOutcome::Discarded);
            }
            let person = self.ctx.resolver.resolve_person(&block.object).await?;
            ModerationAction::BanFromSite {
                actor: actor.ap_id.clone(),
                person: person.ap_id,
                instance: target_instance,
                banned,
                remove_data: block.remove_data,
                reason: block.summary.clone(),
                expires_at: block.expires,
                at,
            }
        } else {
            let community = self.ctx.resolver.resolve_community(&block.target).await?;
            let person = self.ctx.resolver.resolve_person(&block.object).await?;
            let action = ModerationAction::BanFromCommunity {
                actor: actor.ap_id.clone(),
                person: person.ap_id,
                community: community.ap_id.clone(),
                banned,
                remove_data: block.remove_data,
                reason: block.summary.clone(),
                expires_at: block.expires,
                at,
            };
            let caps = resolve_capabilities(&actor, None, &community);
            if !action.is_authorized(&caps) {
                tracing::warn!(
                    actor = %actor.ap_id,
                    community = %community.ap_id,
                    capabilities = %caps,
                    "Discarded unauthorized community ban"
                );
                return Ok(InboxOutcome::Discarded);
            }
            action
        };

        let (outcome, changed) = self.ctx.moderation.apply_ban(&action).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %actor.ap_id,
                object = %block.object,
                action = action.name(),
                banned,
                posts_changed = changed,
                "Applied ban"
            );
        }
        Ok(outcome.into())
    }
}
