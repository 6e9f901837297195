//! Local site repository.

use std::sync::Arc;

use chrono::Utc;
use crate::entities::LocalSite;
use fedsync_common::AppResult;
use tokio::sync::RwLock;

/// Holds the single policy row of this node.
#[derive(Clone)]
pub struct LocalSiteRepository {
    site: Arc<RwLock<LocalSite>>,
}

impl LocalSiteRepository {
    /// Create a repository seeded with `site`.
    #[must_use]
    pub fn new(site: LocalSite) -> Self {
        Self {
            site: Arc::new(RwLock::new(site)),
        }
    }

    /// Current policy row.
    pub async fn get(&self) -> AppResult<LocalSite> {
        Ok(self.site.read().await.clone())
    }

    /// Mutate the policy row and stamp `updated_at`.
    pub async fn update<F>(&self, f: F) -> AppResult<LocalSite>
    where
        F: FnOnce(&mut LocalSite),
    {
        let mut site = self.site.write().await;
        f(&mut site);
        site.updated_at = Utc::now();
        Ok(site.clone())
    }
}
