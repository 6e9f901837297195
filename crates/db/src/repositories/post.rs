//! Post repository.

use crate::entities::{Post, PostFilter};
use fedsync_common::{AppError, AppResult, ObjectId};

use super::table::{Record, Table};

impl Record for Post {
    const NAME: &'static str = "post";

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

/// Post repository.
#[derive(Clone, Default)]
pub struct PostRepository {
    table: Table<Post>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a post by local key.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Post>> {
        Ok(self.table.find_by_id(id).await)
    }

    /// Find a post by local key, returning an error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<Post> {
        self.table.get_by_id(id).await
    }

    /// Find a post by its federated identifier.
    pub async fn find_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Option<Post>> {
        Ok(self.table.find_by_key(ap_id.as_str()).await)
    }

    /// Find a post by its federated identifier, returning an error if not found.
    pub async fn get_by_ap_id(&self, ap_id: &ObjectId) -> AppResult<Post> {
        self.find_by_ap_id(ap_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {ap_id}")))
    }

    /// Create a new post.
    pub async fn create(&self, model: Post) -> AppResult<Post> {
        self.table.insert(model).await
    }

    /// Update a post.
    pub async fn update(&self, model: Post) -> AppResult<Post> {
        self.table.update(model).await
    }

    /// Apply `f` to a post atomically. Returns the post and whether `f` changed it.
    pub async fn modify<F>(&self, id: i64, f: F) -> AppResult<(Post, bool)>
    where
        F: FnOnce(&mut Post) -> bool,
    {
        self.table.modify(id, f).await
    }

    /// List posts matching a filter.
    pub async fn list(&self, filter: &PostFilter) -> AppResult<Vec<Post>> {
        Ok(self.table.list(|post| filter.matches(post)).await)
    }

    /// All posts by a creator.
    pub async fn find_by_creator(&self, creator_id: &ObjectId) -> AppResult<Vec<Post>> {
        self.list(&PostFilter {
            creator_id: Some(creator_id.clone()),
            ..PostFilter::default()
        })
        .await
    }
}
