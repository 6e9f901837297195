//! Report repository.

use std::collections::BTreeSet;

use crate::entities::Report;
use fedsync_common::{AppError, AppResult, ObjectId};

use super::table::{Record, Table};

impl Record for Report {
    const NAME: &'static str = "report";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self) -> String {
        self.ap_id.to_string()
    }
}

/// Filter for listing reports.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Only reports in these communities. `None` means all.
    pub community_ids: Option<BTreeSet<ObjectId>>,
    /// Only unresolved reports.
    pub unresolved_only: bool,
}

/// Report repository.
#[derive(Clone, Default)]
pub struct ReportRepository {
    table: Table<Report>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a report by local key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Report>> {
        Ok(self.table.find_by_id(id).await)
    }

    /// Find a report by local key, returning an error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<Report> {
        self.table.get_by_id(id).await
    }

    /// Find a report by federated identifier.
    pub async fn find_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Option<Report>> {
        Ok(self.table.find_by_key(ap_id.as_str()).await)
    }

    /// Find a report by federated identifier, returning an error if not found.
    pub async fn get_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Report> {
        self.find_by_ap_id(ap_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("report {ap_id}")))
    }

    /// Create a new report.
    pub async fn create(&self, model: Report) -> AppResult<Report> {
        self.table.insert(model).await
    }

    /// Apply `f` to a report atomically.
    pub async fn modify<F>(&self, id: i64, f: F) -> AppResult<(Report, bool)>
    where
        F: FnOnce(&mut Report) -> bool,
    {
        self.table.modify(id, f).await
    }

    /// List reports, newest first.
    pub async fn list(&self, filter: &ReportFilter) -> AppResult<Vec<Report>> {
        let mut reports = self
            .table
            .list(|r| {
                if filter.unresolved_only && r.is_resolved() {
                    return false;
                }
                filter
                    .community_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&r.community_id))
            })
            .await;
        reports.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(reports)
    }
}
