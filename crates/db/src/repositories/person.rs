//! Person repository.

use crate::entities::Person;
use fedsync_common::{AppError, AppResult, ObjectId};

use super::table::{Record, Table};

impl Record for Person {
    const NAME: &'static str = "person";

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

/// Person repository.
#[derive(Clone, Default)]
pub struct PersonRepository {
    table: Table<Person>,
}

impl PersonRepository {
    /// Create a new person repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a person by local key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Person>> {
        Ok(self.table.find_by_id(id).await)
    }

    /// Find a person by federated identifier.
    pub async fn find_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Option<Person>> {
        Ok(self.table.find_by_key(ap_id.as_str()).await)
    }

    /// Find a person by federated identifier, returning an error if not found.
    pub async fn get_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Person> {
        self.find_by_ap_id(ap_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("person {ap_id}")))
    }

    /// Find a local person by name.
    pub async fn find_local_by_name(&self, name: &str) -> AppResult<Option<Person>> {
        Ok(self
            .table
            .list(|p| p.local && p.name == name)
            .await
            .into_iter()
            .next())
    }

    /// Create a new person.
    pub async fn create(&self, model: Person) -> AppResult<Person> {
        self.table.insert(model).await
    }

    /// Insert or replace a person by identifier.
    pub async fn upsert(&self, model: Person) -> AppResult<Person> {
        Ok(self.table.upsert(model).await)
    }

    /// Apply `f` to a person atomically.
    pub async fn modify<F>(&self, id: i64, f: F) -> AppResult<(Person, bool)>
    where
        F: FnOnce(&mut Person) -> bool,
    {
        self.table.modify(id, f).await
    }

    /// Local admins.
    pub async fn find_local_admins(&self) -> AppResult<Vec<Person>> {
        Ok(self.table.list(|p| p.local && p.admin).await)
    }
}
