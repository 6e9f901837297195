//! Vote repository.

use crate::entities::Vote;
use fedsync_common::{AppResult, ObjectId};

use super::table::{Record, Table};

impl Record for Vote {
    const NAME: &'static str = "vote";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self) -> String {
        vote_key(&self.person_id, &self.post_id)
    }
}

fn vote_key(person: &ObjectId, post: &ObjectId) -> String {
    format!("{person} {post}")
}

/// Vote repository.
#[derive(Clone, Default)]
pub struct VoteRepository {
    table: Table<Vote>,
}

impl VoteRepository {
    /// Create a new vote repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a person's vote on a post.
    pub async fn find(&self, person: &ObjectId, post: &ObjectId) -> AppResult<Option<Vote>> {
        Ok(self.table.find_by_key(&vote_key(person, post)).await)
    }

    /// Record or replace a vote.
    pub async fn upsert(&self, model: Vote) -> AppResult<Vote> {
        Ok(self.table.upsert(model).await)
    }

    /// Retract a vote.
    pub async fn delete(&self, person: &ObjectId, post: &ObjectId) -> AppResult<bool> {
        Ok(self
            .table
            .delete_by_key(&vote_key(person, post))
            .await
            .is_some())
    }

    /// Sum of the vote records held for a post.
    pub async fn score(&self, post: &ObjectId) -> AppResult<i64> {
        Ok(self
            .table
            .list(|v| &v.post_id == post)
            .await
            .iter()
            .map(|v| i64::from(v.score))
            .sum())
    }
}
