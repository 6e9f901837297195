//! Site administration: instance blocks, URL blocklist, NSFW toggle.

use fedsync_common::{AppError, AppResult};
use fedsync_db::entities::{LocalSite, Person};
use serde::Deserialize;
use url::Url;

use crate::services::policy::PolicyFilter;

/// Input for editing the site policy. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditSiteInput {
    #[serde(default)]
    pub blocked_urls: Option<Vec<String>>,
    #[serde(default)]
    pub disallow_nsfw_content: Option<bool>,
}

/// Instance service for site policy management.
#[derive(Clone)]
pub struct InstanceService {
    policy: PolicyFilter,
}

impl InstanceService {
    /// Create a new instance service.
    #[must_use]
    pub const fn new(policy: PolicyFilter) -> Self {
        Self { policy }
    }

    fn require_admin(actor: &Person) -> AppResult<()> {
        if actor.local && actor.admin {
            Ok(())
        } else {
            Err(AppError::Unauthorized("admin only".to_string()))
        }
    }

    /// Current site policy.
    pub async fn get_site(&self) -> AppResult<LocalSite> {
        self.policy.site().await
    }

    /// Edit the site policy.
    pub async fn edit_site(&self, actor: &Person, input: EditSiteInput) -> AppResult<LocalSite> {
        Self::require_admin(actor)?;

        if let Some(patterns) = input.blocked_urls {
            for pattern in &patterns {
                Url::parse(pattern).map_err(|e| {
                    AppError::Validation(format!("invalid blocked url {pattern}: {e}"))
                })?;
            }
            self.policy.set_blocked_urls(patterns).await?;
        }
        if let Some(disallow) = input.disallow_nsfw_content {
            self.policy.set_disallow_nsfw_content(disallow).await?;
        }

        let site = self.policy.site().await?;
        tracing::info!(
            actor = %actor.ap_id,
            blocked_urls = site.blocked_urls.len(),
            disallow_nsfw_content = site.disallow_nsfw_content,
            "Edited site policy"
        );
        Ok(site)
    }

    /// Block or unblock an instance.
    pub async fn set_instance_blocked(
        &self,
        actor: &Person,
        domain: &str,
        blocked: bool,
    ) -> AppResult<LocalSite> {
        Self::require_admin(actor)?;
        let site = if blocked {
            self.policy.block_instance(domain).await?
        } else {
            self.policy.unblock_instance(domain).await?
        };
        tracing::info!(actor = %actor.ap_id, instance = domain, blocked, "Changed instance block");
        Ok(site)
    }
}
