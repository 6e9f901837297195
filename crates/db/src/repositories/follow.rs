//! Follow repository.

use crate::entities::{Follow, FollowState};
use fedsync_common::{AppResult, InstanceId, ObjectId};

use super::table::{Record, Table};

impl Record for Follow {
    const NAME: &'static str = "follow";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self) -> String {
        follow_key(&self.follower_id, &self.community_id)
    }
}

fn follow_key(follower: &ObjectId, community: &ObjectId) -> String {
    format!("{follower} {community}")
}

/// Follow repository.
#[derive(Clone, Default)]
pub struct FollowRepository {
    table: Table<Follow>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a follow relation.
    pub async fn find(
        &self,
        follower: &ObjectId,
        community: &ObjectId,
    ) -> AppResult<Option<Follow>> {
        Ok(self
            .table
            .find_by_key(&follow_key(follower, community))
            .await)
    }

    /// Insert or replace a follow relation.
    pub async fn upsert(&self, model: Follow) -> AppResult<Follow> {
        Ok(self.table.upsert(model).await)
    }

    /// Mark a follow as accepted. Returns `None` if no such follow exists.
    pub async fn accept(
        &self,
        follower: &ObjectId,
        community: &ObjectId,
    ) -> AppResult<Option<Follow>> {
        let Some(follow) = self.find(follower, community).await? else {
            return Ok(None);
        };
        let (follow, _) = self
            .table
            .modify(follow.id, |f| {
                let changed = f.state != FollowState::Accepted;
                f.state = FollowState::Accepted;
                changed
            })
            .await?;
        Ok(Some(follow))
    }

    /// Delete a follow relation.
    pub async fn delete(&self, follower: &ObjectId, community: &ObjectId) -> AppResult<bool> {
        Ok(self
            .table
            .delete_by_key(&follow_key(follower, community))
            .await
            .is_some())
    }

    /// Followers of a community.
    pub async fn find_by_community(&self, community: &ObjectId) -> AppResult<Vec<Follow>> {
        Ok(self.table.list(|f| &f.community_id == community).await)
    }

    /// Instances with an accepted follower of `community`.
    pub async fn follower_instances(&self, community: &ObjectId) -> AppResult<Vec<InstanceId>> {
        let mut instances: Vec<InstanceId> = self
            .find_by_community(community)
            .await?
            .iter()
            .filter(|f| f.is_accepted())
            .filter_map(|f| f.follower_id.instance().ok())
            .collect();
        instances.sort();
        instances.dedup();
        Ok(instances)
    }

    /// Whether any follower from `instance` exists for `community`, accepted or not.
    pub async fn has_follower_from(
        &self,
        community: &ObjectId,
        instance: &InstanceId,
    ) -> AppResult<bool> {
        Ok(self
            .find_by_community(community)
            .await?
            .iter()
            .any(|f| f.follower_id.instance().ok().as_ref() == Some(instance)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{community_id, follow_fixture, person_id};

    #[tokio::test]
    async fn test_follower_instances_only_accepted() {
        let repo = FollowRepository::new();
        let community = community_id("alpha", "main");
        repo.upsert(follow_fixture(&person_id("beta", "bob"), &community))
            .await
            .unwrap();
        repo.upsert(follow_fixture(&person_id("beta", "bill"), &community))
            .await
            .unwrap();
        repo.upsert(follow_fixture(&person_id("gamma", "gus"), &community))
            .await
            .unwrap();

        assert!(repo.follower_instances(&community).await.unwrap().is_empty());

        repo.accept(&person_id("beta", "bob"), &community)
            .await
            .unwrap();
        repo.accept(&person_id("beta", "bill"), &community)
            .await
            .unwrap();
        let instances = repo.follower_instances(&community).await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].domain(), "beta.example");

        let gamma = person_id("gamma", "gus").instance().unwrap();
        assert!(repo.has_follower_from(&community, &gamma).await.unwrap());
        assert!(repo.delete(&person_id("gamma", "gus"), &community).await.unwrap());
        assert!(!repo.has_follower_from(&community, &gamma).await.unwrap());
    }
}
