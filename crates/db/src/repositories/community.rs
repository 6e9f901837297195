//! Community repository.

use crate::entities::Community;
use fedsync_common::{AppError, AppResult, ObjectId};

use super::table::{Record, Table};

impl Record for Community {
    const NAME: &'static str = "community";

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

/// Community repository.
#[derive(Clone, Default)]
pub struct CommunityRepository {
    table: Table<Community>,
}

impl CommunityRepository {
    /// Create a new community repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a community by local key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Community>> {
        Ok(self.table.find_by_id(id).await)
    }

    /// Find a community by its federated identifier.
    pub async fn find_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Option<Community>> {
        Ok(self.table.find_by_key(ap_id.as_str()).await)
    }

    /// Find a community by its federated identifier, returning an error if not found.
    pub async fn get_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Community> {
        self.find_by_ap_id(ap_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("community {ap_id}")))
    }

    /// Find a local community by name.
    pub async fn find_local_by_name(&self, name: &str) -> AppResult<Option<Community>> {
        Ok(self
            .table
            .list(|c| c.local && c.name == name)
            .await
            .into_iter()
            .next())
    }

    /// Create a new community.
    pub async fn create(&self, model: Community) -> AppResult<Community> {
        self.table.insert(model).await
    }

    /// Insert or replace a community by identifier.
    pub async fn upsert(&self, model: Community) -> AppResult<Community> {
        Ok(self.table.upsert(model).await)
    }

    /// Apply `f` to a community atomically.
    pub async fn modify<F>(&self, id: i64, f: F) -> AppResult<(Community, bool)>
    where
        F: FnOnce(&mut Community) -> bool,
    {
        self.table.modify(id, f).await
    }

    /// Communities moderated by `person`.
    pub async fn find_moderated_by(&self, person: &ObjectId) -> AppResult<Vec<Community>> {
        Ok(self.table.list(|c| c.is_moderator(person)).await)
    }

    /// All communities.
    pub async fn list(&self) -> AppResult<Vec<Community>> {
        Ok(self.table.list(|_| true).await)
    }
}
