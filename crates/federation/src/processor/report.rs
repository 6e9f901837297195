//! Reports and their resolution.

use chrono::{DateTime, Utc};
use fedsync_common::{AppResult, ObjectId};
use fedsync_core::{FacetOutcome, resolve_capabilities};
use fedsync_db::entities::{Facet, Report};
use url::Url;

use super::{InboxOutcome, same_origin};
use crate::activities::{ReportActivity, ResolveReport};
use crate::context::FederationContext;

/// Processor for Flag and Resolve.
#[derive(Clone)]
pub struct ReportProcessor {
    ctx: FederationContext,
}

impl ReportProcessor {
    /// Create a new report processor.
    #[must_use]
    pub const fn new(ctx: FederationContext) -> Self {
        Self { ctx }
    }

    /// Store a report filed on another node.
    pub async fn process_report(&self, report: &ReportActivity) -> AppResult<InboxOutcome> {
        if !same_origin(&report.id, &report.actor)? {
            return Ok(InboxOutcome::Discarded);
        }
        let (report, outcome) = self.store_report(report).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %report.reporter_id,
                object = %report.post_id,
                report = %report.ap_id,
                "Received report"
            );
        }
        Ok(outcome.into())
    }

    /// Resolve or reopen a report.
    pub async fn process_resolve(
        &self,
        resolve: &ResolveReport,
        actor: &Url,
        resolved: bool,
        at: DateTime<Utc>,
    ) -> AppResult<InboxOutcome> {
        let report_id = ObjectId::new(resolve.object.id.clone());
        if self.ctx.store.reports.find_by_ap_id(&report_id).await?.is_none() {
            if !same_origin(&resolve.object.id, &resolve.object.actor)? {
                return Ok(InboxOutcome::Discarded);
            }
            self.store_report(&resolve.object).await?;
        }

        let resolver = self.ctx.resolver.resolve_person(actor).await?;
        let report = self.ctx.store.reports.get_by_ap_id(&report_id).await?;
        let community = self
            .ctx
            .store
            .communities
            .get_by_ap_id(&report.community_id)
            .await?;
        let caps = resolve_capabilities(&resolver, None, &community);
        if !caps.can_moderate() {
            tracing::warn!(
                actor = %resolver.ap_id,
                report = %report.ap_id,
                capabilities = %caps,
                "Discarded unauthorized report resolution"
            );
            return Ok(InboxOutcome::Discarded);
        }

        let (report, outcome) = self
            .ctx
            .reports
            .apply_resolution(&report_id, &resolver.ap_id, resolved, at)
            .await?;
        if outcome.is_applied() {
            tracing::info!(actor = %resolver.ap_id, report = %report.ap_id, resolved, "Applied report resolution");
        }
        Ok(outcome.into())
    }

    async fn store_report(
        &self,
        activity: &ReportActivity,
    ) -> AppResult<(Report, FacetOutcome)> {
        let reporter = self.ctx.resolver.resolve_person(&activity.actor).await?;
        let community = self.ctx.resolver.resolve_community(&activity.audience).await?;
        let creator = self
            .ctx
            .resolver
            .resolve_person(&activity.attributed_to)
            .await?;
        self.ctx
            .reports
            .receive_report(Report {
                id: 0,
                ap_id: ObjectId::new(activity.id.clone()),
                local: false,
                post_id: ObjectId::new(activity.object.clone()),
                community_id: community.ap_id,
                creator_id: creator.ap_id,
                reporter_id: reporter.ap_id,
                reason: activity.summary.clone(),
                original_post_name: activity.original_post_name.clone(),
                original_post_url: activity.original_post_url.clone(),
                original_post_body: activity.original_post_body.clone(),
                published_at: activity.published,
                resolved: Facet::default(),
                resolver_id: None,
            })
            .await
    }
}
