//! Ban repository.

use chrono::{DateTime, Utc};
use crate::entities::{CommunityBan, InstanceBan};
use fedsync_common::{AppResult, InstanceId, ObjectId};

use super::table::{Record, Table};

impl Record for InstanceBan {
    const NAME: &'static str = "instance_ban";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self) -> String {
        format!("{} {}", self.person_id, self.instance.domain())
    }
}

impl Record for CommunityBan {
    const NAME: &'static str = "community_ban";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn key(&self) -> String {
        format!("{} {}", self.person_id, self.community_id)
    }
}

/// Repository for instance and community bans.
#[derive(Clone, Default)]
pub struct BanRepository {
    instance_bans: Table<InstanceBan>,
    community_bans: Table<CommunityBan>,
}

impl BanRepository {
    /// Create a new ban repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the ban of `person` by `instance` in place.
    ///
    /// `f` sees the stored row, or an empty one, and returns whether it
    /// changed anything.
    pub async fn write_instance_ban<F>(
        &self,
        person: &ObjectId,
        instance: &InstanceId,
        f: F,
    ) -> AppResult<(InstanceBan, bool)>
    where
        F: FnOnce(&mut InstanceBan) -> bool,
    {
        let empty = InstanceBan::empty(person.clone(), instance.clone());
        Ok(self.instance_bans.modify_or_insert(empty, f).await)
    }

    /// Ban of `person` by `instance` in force at `now`.
    pub async fn find_instance_ban(
        &self,
        person: &ObjectId,
        instance: &InstanceId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<InstanceBan>> {
        Ok(self
            .instance_bans
            .find_by_key(&format!("{person} {}", instance.domain()))
            .await
            .filter(|ban| ban.is_in_force(now)))
    }

    /// Write the ban of `person` from `community` in place.
    pub async fn write_community_ban<F>(
        &self,
        person: &ObjectId,
        community: &ObjectId,
        f: F,
    ) -> AppResult<(CommunityBan, bool)>
    where
        F: FnOnce(&mut CommunityBan) -> bool,
    {
        let empty = CommunityBan::empty(person.clone(), community.clone());
        Ok(self.community_bans.modify_or_insert(empty, f).await)
    }

    /// Community ban of `person` in force at `now`.
    pub async fn find_community_ban(
        &self,
        person: &ObjectId,
        community: &ObjectId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<CommunityBan>> {
        Ok(self
            .community_bans
            .find_by_key(&format!("{person} {community}"))
            .await
            .filter(|ban| ban.is_in_force(now)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::Facet;
    use crate::test_utils::{community_id, person_id};
    use chrono::Duration;

    #[tokio::test]
    async fn test_expired_community_ban_is_ignored() {
        let repo = BanRepository::new();
        let now = Utc::now();
        let person = person_id("beta", "bob");
        let community = community_id("alpha", "main");

        repo.write_community_ban(&person, &community, |ban| {
            ban.banned = Facet::set(true, now - Duration::hours(2));
            ban.expires_at = Some(now - Duration::hours(1));
            true
        })
        .await
        .unwrap();
        assert!(
            repo.find_community_ban(&person, &community, now)
                .await
                .unwrap()
                .is_none()
        );

        let (ban, _) = repo
            .write_community_ban(&person, &community, |ban| {
                ban.banned = Facet::set(true, now);
                ban.reason = Some("spam".to_string());
                ban.expires_at = None;
                true
            })
            .await
            .unwrap();
        assert_eq!(ban.reason.as_deref(), Some("spam"));
        assert!(
            repo.find_community_ban(&person, &community, now)
                .await
                .unwrap()
                .is_some()
        );

        repo.write_community_ban(&person, &community, |ban| {
            ban.banned = Facet::set(false, now);
            true
        })
        .await
        .unwrap();
        assert!(
            repo.find_community_ban(&person, &community, now)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_instance_ban_keyed_by_domain() {
        let repo = BanRepository::new();
        let now = Utc::now();
        let person = person_id("beta", "bob");
        let alpha = community_id("alpha", "main").instance().unwrap();
        let gamma = community_id("gamma", "main").instance().unwrap();

        let (first, _) = repo
            .write_instance_ban(&person, &alpha, |ban| {
                ban.banned = Facet::set(true, now);
                true
            })
            .await
            .unwrap();
        let (again, changed) = repo
            .write_instance_ban(&person, &alpha, |_| false)
            .await
            .unwrap();
        assert!(!changed);
        assert_eq!(again.id, first.id);

        assert!(repo.find_instance_ban(&person, &alpha, now).await.unwrap().is_some());
        assert!(repo.find_instance_ban(&person, &gamma, now).await.unwrap().is_none());
    }
}
