//! Report service.
//!
//! A report lives on every node that holds it: where it was filed, the
//! community's home, the creator's home and every instance hosting a
//! moderator. Each copy keeps its own resolution state, which converges
//! through last-writer-wins on the resolved facet.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use fedsync_common::{AppError, AppResult, IdGenerator, ObjectId};
use fedsync_db::Store;
use fedsync_db::entities::{Facet, Person, Report};
use fedsync_db::repositories::ReportFilter;
use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::authority::resolve_capabilities;
use crate::facets::{FacetOutcome, write_facet};
use crate::services::delivery::{Announcement, AnnouncerService, announce_or_warn};

/// Input for reporting a post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportInput {
    pub post_id: ObjectId,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Report service.
#[derive(Clone)]
pub struct ReportService {
    store: Store,
    announcer: AnnouncerService,
    base_url: Url,
    id_gen: IdGenerator,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(store: Store, announcer: AnnouncerService, base_url: Url) -> Self {
        Self {
            store,
            announcer,
            base_url,
            id_gen: IdGenerator::new(),
        }
    }

    /// Report a post, snapshotting its current content.
    pub async fn create_report(&self, actor: &Person, input: CreateReportInput) -> AppResult<Report> {
        input.validate()?;
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest("Report reason is required".to_string()));
        }

        let post = self.store.posts.get_by_ap_id(&input.post_id).await?;
        let report = Report {
            id: 0,
            ap_id: self.id_gen.object_id(&self.base_url, "report")?,
            local: true,
            post_id: post.ap_id.clone(),
            community_id: post.community_id.clone(),
            creator_id: post.creator_id.clone(),
            reporter_id: actor.ap_id.clone(),
            reason: reason.to_string(),
            original_post_name: post.name.clone(),
            original_post_url: post.url.clone(),
            original_post_body: post.body.clone(),
            published_at: Utc::now(),
            resolved: Facet::default(),
            resolver_id: None,
        };
        let report = self.store.reports.create(report).await?;

        tracing::info!(actor = %actor.ap_id, object = %report.ap_id, post = %post.ap_id, "Created report");
        announce_or_warn(
            &self.announcer,
            Announcement::Report {
                report: report.clone(),
            },
        )
        .await;

        Ok(report)
    }

    /// Store a report received from another node. Replays are no-ops.
    pub async fn receive_report(&self, incoming: Report) -> AppResult<(Report, FacetOutcome)> {
        if let Some(existing) = self.store.reports.find_by_ap_id(&incoming.ap_id).await? {
            return Ok((existing, FacetOutcome::Stale));
        }
        let report = self
            .store
            .reports
            .create(Report {
                local: false,
                resolved: Facet::default(),
                resolver_id: None,
                ..incoming
            })
            .await?;
        Ok((report, FacetOutcome::Applied))
    }

    /// Resolve or reopen a report.
    ///
    /// Authority: a moderator of the report's community or an admin of the
    /// community's home instance. Resolving an already resolved report returns
    /// it unchanged.
    pub async fn resolve_report(
        &self,
        actor: &Person,
        report_id: &ObjectId,
        resolved: bool,
    ) -> AppResult<Report> {
        let report = self.store.reports.get_by_ap_id(report_id).await?;
        let community = self
            .store
            .communities
            .get_by_ap_id(&report.community_id)
            .await?;
        if !resolve_capabilities(actor, None, &community).can_moderate() {
            return Err(AppError::Unauthorized(
                "only a moderator can resolve reports".to_string(),
            ));
        }
        if report.resolved.value == resolved {
            tracing::debug!(object = %report.ap_id, resolved, "Report already in requested state");
            return Ok(report);
        }

        let at = Utc::now();
        let (report, _) = self
            .apply_resolution(report_id, &actor.ap_id, resolved, at)
            .await?;

        tracing::info!(actor = %actor.ap_id, object = %report.ap_id, resolved, "Resolved report");
        announce_or_warn(
            &self.announcer,
            Announcement::ResolveReport {
                actor: actor.ap_id.clone(),
                report: report.clone(),
                resolved,
                at,
            },
        )
        .await;

        Ok(report)
    }

    /// Apply a resolution through last-writer-wins.
    pub async fn apply_resolution(
        &self,
        report_id: &ObjectId,
        resolver: &ObjectId,
        resolved: bool,
        at: DateTime<Utc>,
    ) -> AppResult<(Report, FacetOutcome)> {
        let report = self.store.reports.get_by_ap_id(report_id).await?;
        let (report, applied) = self
            .store
            .reports
            .modify(report.id, |r| {
                let applied = write_facet(&mut r.resolved, resolved, at).is_applied();
                if applied {
                    r.resolver_id = Some(resolver.clone());
                }
                applied
            })
            .await?;
        let outcome = if applied {
            FacetOutcome::Applied
        } else {
            FacetOutcome::Stale
        };
        Ok((report, outcome))
    }

    /// Reports visible to `viewer`, newest first.
    ///
    /// Moderators see their communities. Local admins also see local
    /// communities, and every held report with `show_mod_reports`.
    pub async fn list_reports(
        &self,
        viewer: &Person,
        show_mod_reports: bool,
        unresolved_only: bool,
    ) -> AppResult<Vec<Report>> {
        let is_admin = viewer.local && viewer.admin;
        let community_ids = if is_admin && show_mod_reports {
            None
        } else {
            let mut ids: BTreeSet<ObjectId> = self
                .store
                .communities
                .find_moderated_by(&viewer.ap_id)
                .await?
                .into_iter()
                .map(|c| c.ap_id)
                .collect();
            if is_admin {
                ids.extend(
                    self.store
                        .communities
                        .list()
                        .await?
                        .into_iter()
                        .filter(|c| c.local)
                        .map(|c| c.ap_id),
                );
            }
            Some(ids)
        };

        self.store
            .reports
            .list(&ReportFilter {
                community_ids,
                unresolved_only,
            })
            .await
    }
}
