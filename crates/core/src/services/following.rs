//! Community following service.

use chrono::Utc;
use fedsync_common::{AppResult, ObjectId};
use fedsync_db::Store;
use fedsync_db::entities::{Community, Follow, FollowState, Person};

use crate::services::delivery::{Announcement, AnnouncerService, announce_or_warn};

/// Result of a follow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowResult {
    /// Now following.
    Following,
    /// Waiting for the community's home instance to accept.
    Pending,
}

/// Following service.
#[derive(Clone)]
pub struct FollowingService {
    store: Store,
    announcer: AnnouncerService,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(store: Store, announcer: AnnouncerService) -> Self {
        Self { store, announcer }
    }

    /// Follow a community as a local person.
    pub async fn follow(&self, actor: &Person, community_id: &ObjectId) -> AppResult<FollowResult> {
        let community = self.store.communities.get_by_ap_id(community_id).await?;
        if let Some(existing) = self.store.follows.find(&actor.ap_id, community_id).await? {
            return Ok(if existing.is_accepted() {
                FollowResult::Following
            } else {
                FollowResult::Pending
            });
        }

        let state = if community.local {
            FollowState::Accepted
        } else {
            FollowState::Pending
        };
        self.store
            .follows
            .upsert(Follow {
                id: 0,
                follower_id: actor.ap_id.clone(),
                community_id: community_id.clone(),
                state,
                published_at: Utc::now(),
            })
            .await?;

        tracing::info!(actor = %actor.ap_id, community = %community_id, "Followed community");
        if community.local {
            return Ok(FollowResult::Following);
        }
        announce_or_warn(
            &self.announcer,
            Announcement::Follow {
                follower: actor.ap_id.clone(),
                community: community_id.clone(),
                follow: true,
            },
        )
        .await;
        Ok(FollowResult::Pending)
    }

    /// Stop following a community.
    pub async fn unfollow(&self, actor: &Person, community_id: &ObjectId) -> AppResult<()> {
        let community = self.store.communities.get_by_ap_id(community_id).await?;
        if !self.store.follows.delete(&actor.ap_id, community_id).await? {
            return Ok(());
        }
        tracing::info!(actor = %actor.ap_id, community = %community_id, "Unfollowed community");
        if !community.local {
            announce_or_warn(
                &self.announcer,
                Announcement::Follow {
                    follower: actor.ap_id.clone(),
                    community: community_id.clone(),
                    follow: false,
                },
            )
            .await;
        }
        Ok(())
    }

    /// Accept a remote follower of a local community.
    pub async fn receive_follow(&self, follower: &Person, community: &Community) -> AppResult<Follow> {
        let follow = self
            .store
            .follows
            .upsert(Follow {
                id: 0,
                follower_id: follower.ap_id.clone(),
                community_id: community.ap_id.clone(),
                state: FollowState::Accepted,
                published_at: Utc::now(),
            })
            .await?;
        announce_or_warn(
            &self.announcer,
            Announcement::AcceptFollow {
                follower: follower.ap_id.clone(),
                community: community.ap_id.clone(),
            },
        )
        .await;
        Ok(follow)
    }

    /// Drop a remote follower.
    pub async fn receive_unfollow(&self, follower: &ObjectId, community: &ObjectId) -> AppResult<bool> {
        self.store.follows.delete(follower, community).await
    }

    /// Mark a local person's follow accepted.
    pub async fn receive_accept(
        &self,
        follower: &ObjectId,
        community: &ObjectId,
    ) -> AppResult<Option<Follow>> {
        self.store.follows.accept(follower, community).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::delivery::testing::RecordingAnnouncer;
    use crate::services::testing::{alpha_store, local_person, remote_person};
    use fedsync_db::test_utils::community_fixture;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_follow_remote_is_pending_until_accepted() {
        let (store, _, local_community) = alpha_store().await;
        let announcer = RecordingAnnouncer::default();
        let service = FollowingService::new(store.clone(), Arc::new(announcer.clone()));
        let alice = local_person(&store, "alice").await;
        let remote = store
            .communities
            .create(community_fixture("beta", "main", false))
            .await
            .unwrap();

        assert_eq!(
            service.follow(&alice, &local_community).await.unwrap(),
            FollowResult::Following
        );
        assert_eq!(
            service.follow(&alice, &remote.ap_id).await.unwrap(),
            FollowResult::Pending
        );
        service.receive_accept(&alice.ap_id, &remote.ap_id).await.unwrap();
        assert_eq!(
            service.follow(&alice, &remote.ap_id).await.unwrap(),
            FollowResult::Following
        );
        service.unfollow(&alice, &remote.ap_id).await.unwrap();
        assert_eq!(announcer.names().await, vec!["follow", "follow"]);
    }

    #[tokio::test]
    async fn test_receive_follow_accepts() {
        let (store, _, local_community) = alpha_store().await;
        let announcer = RecordingAnnouncer::default();
        let service = FollowingService::new(store.clone(), Arc::new(announcer.clone()));
        let bob = remote_person(&store, "beta", "bob").await;
        let community = store.communities.get_by_ap_id(&local_community).await.unwrap();

        let follow = service.receive_follow(&bob, &community).await.unwrap();
        assert!(follow.is_accepted());
        assert_eq!(
            store.follows.follower_instances(&local_community).await.unwrap()[0].domain(),
            "beta.example"
        );
        assert_eq!(announcer.names().await, vec!["accept_follow"]);
        assert!(service.receive_unfollow(&bob.ap_id, &local_community).await.unwrap());
    }
}
