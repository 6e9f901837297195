//! Outbound announcer.
//!
//! Turns each local [`Announcement`] into one activity and hands it to the
//! delivery queue, addressed to the instances that hold a copy of the
//! affected object. When this node hosts the community, the activity goes out
//! wrapped in an Announce from the community actor; otherwise it goes to the
//! community's home, which re-announces it.

use std::collections::BTreeSet;

use activitypub_federation::kinds::activity::{
    AcceptType, AddType, BlockType, FlagType, RemoveType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fedsync_common::{AppError, AppResult, IdGenerator, InstanceId, ObjectId};
use fedsync_core::{Announcement, Announcer, ModerationAction};
use fedsync_db::Store;
use fedsync_db::entities::{Community, Post, PostFilter, Report};
use serde::Serialize;
use url::Url;

use crate::activities::{
    AcceptActivity, AnnouncableActivity, AnnounceActivity, BlockUser, CollectionAdd,
    CollectionRemove, CreateOrUpdatePage, CreateOrUpdateType, DeleteActivity, FollowActivity,
    InboxActivity, LockPage, LockType, ReportActivity, ResolveReport, ResolveType, UndoActivity,
    UndoObject, VoteActivity, VoteType, featured_url, moderators_url,
};
use crate::convert::PostToApPage;
use crate::delivery::DeliveryQueueService;

/// Announcer delivering through a [`crate::delivery::DeliveryQueue`].
#[derive(Clone)]
pub struct OutboundAnnouncer {
    store: Store,
    queue: DeliveryQueueService,
    base_url: Url,
    instance: InstanceId,
    id_gen: IdGenerator,
}

impl OutboundAnnouncer {
    /// Create a new announcer.
    pub fn new(store: Store, queue: DeliveryQueueService, base_url: Url) -> AppResult<Self> {
        let instance = InstanceId::from_url(&base_url)?;
        Ok(Self {
            store,
            queue,
            base_url,
            instance,
            id_gen: IdGenerator::new(),
        })
    }

    fn activity_id(&self, kind: &str) -> AppResult<Url> {
        self.id_gen.activity_id(&self.base_url, kind)
    }

    // ========== Routing ==========

    /// Send `activity` toward everyone following `community`.
    ///
    /// `extra` instances get the same payload.
    async fn to_community(
        &self,
        community_id: &ObjectId,
        activity: AnnouncableActivity,
        extra: BTreeSet<InstanceId>,
    ) -> AppResult<()> {
        let community = self.store.communities.get_by_ap_id(community_id).await?;
        let (payload, mut recipients) = if community.local {
            let announce = self.wrap(&community, activity)?;
            let followers = self.follower_instances(&community).await?;
            (InboxActivity::Announce(announce), followers)
        } else {
            let home = BTreeSet::from([community.ap_id.instance()?]);
            (InboxActivity::Announcable(activity), home)
        };
        recipients.extend(extra);
        self.deliver(&payload, recipients).await
    }

    /// Re-announce an activity received from `sender` to the followers of a
    /// community hosted here.
    pub async fn relay(
        &self,
        community: &Community,
        activity: AnnouncableActivity,
        sender: &InstanceId,
    ) -> AppResult<()> {
        let mut recipients = self.follower_instances(community).await?;
        recipients.extend(self.moderator_instances(community));
        recipients.remove(sender);
        if recipients.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            community = %community.ap_id,
            activity_id = %activity.id(),
            recipients = recipients.len(),
            "Re-announcing to followers"
        );
        let announce = self.wrap(community, activity)?;
        self.deliver(&InboxActivity::Announce(announce), recipients)
            .await
    }

    fn wrap(&self, community: &Community, activity: AnnouncableActivity) -> AppResult<AnnounceActivity> {
        Ok(AnnounceActivity::new(
            self.activity_id("announce")?,
            community.ap_id.inner().clone(),
            activity,
            Utc::now(),
        ))
    }

    async fn follower_instances(&self, community: &Community) -> AppResult<BTreeSet<InstanceId>> {
        Ok(self
            .store
            .follows
            .follower_instances(&community.ap_id)
            .await?
            .into_iter()
            .collect())
    }

    fn moderator_instances(&self, community: &Community) -> BTreeSet<InstanceId> {
        community
            .moderators
            .iter()
            .filter_map(|m| m.instance().ok())
            .collect()
    }

    async fn deliver<T: Serialize + Sync>(
        &self,
        activity: &T,
        recipients: BTreeSet<InstanceId>,
    ) -> AppResult<()> {
        let value = serde_json::to_value(activity)?;
        for recipient in recipients {
            if recipient == self.instance {
                continue;
            }
            tracing::debug!(
                instance = %recipient,
                activity_id = %value["id"].as_str().unwrap_or_default(),
                "Enqueueing delivery"
            );
            self.queue.enqueue(recipient, value.clone()).await?;
        }
        Ok(())
    }

    // ========== Activity builders ==========

    fn undo(&self, actor: &ObjectId, object: UndoObject, at: DateTime<Utc>) -> AppResult<UndoActivity> {
        Ok(UndoActivity::new(
            self.activity_id("undo")?,
            actor.inner().clone(),
            object,
            at,
        ))
    }

    fn report_activity(&self, report: &Report) -> ReportActivity {
        ReportActivity {
            kind: FlagType::Flag,
            id: report.ap_id.inner().clone(),
            actor: report.reporter_id.inner().clone(),
            object: report.post_id.inner().clone(),
            audience: report.community_id.inner().clone(),
            attributed_to: report.creator_id.inner().clone(),
            summary: report.reason.clone(),
            original_post_name: report.original_post_name.clone(),
            original_post_url: report.original_post_url.clone(),
            original_post_body: report.original_post_body.clone(),
            published: report.published_at,
        }
    }

    /// Build the activity for a moderation action.
    fn moderation_activity(
        &self,
        action: &ModerationAction,
        post: Option<&Post>,
    ) -> AppResult<AnnouncableActivity> {
        let audience = |post: Option<&Post>| -> AppResult<Url> {
            post.map(|p| p.community_id.inner().clone()).ok_or_else(|| {
                AppError::Internal(format!("{} without post", action.name()))
            })
        };

        let activity = match action {
            ModerationAction::Lock {
                actor,
                post: target,
                locked,
                at,
            } => {
                let lock = LockPage {
                    kind: LockType::Lock,
                    id: self.activity_id("lock")?,
                    actor: actor.inner().clone(),
                    object: target.inner().clone(),
                    audience: audience(post)?,
                    published: *at,
                };
                if *locked {
                    AnnouncableActivity::Lock(lock)
                } else {
                    AnnouncableActivity::Undo(self.undo(actor, UndoObject::Lock(lock), *at)?)
                }
            }
            ModerationAction::Remove {
                actor,
                post: target,
                removed,
                reason,
                at,
                ..
            } => {
                let delete = DeleteActivity::new(
                    self.activity_id("delete")?,
                    actor.inner().clone(),
                    target.inner().clone(),
                    audience(post)?,
                    *at,
                )
                .removal(reason.clone());
                if *removed {
                    AnnouncableActivity::Delete(delete)
                } else {
                    AnnouncableActivity::Undo(self.undo(actor, UndoObject::Delete(delete), *at)?)
                }
            }
            ModerationAction::Delete {
                actor,
                post: target,
                deleted,
                at,
            } => {
                let delete = DeleteActivity::new(
                    self.activity_id("delete")?,
                    actor.inner().clone(),
                    target.inner().clone(),
                    audience(post)?,
                    *at,
                );
                if *deleted {
                    AnnouncableActivity::Delete(delete)
                } else {
                    AnnouncableActivity::Undo(self.undo(actor, UndoObject::Delete(delete), *at)?)
                }
            }
            ModerationAction::Feature {
                actor,
                post: target,
                featured,
                at,
            } => {
                let collection = featured_url(&audience(post)?);
                if *featured {
                    AnnouncableActivity::Add(CollectionAdd {
                        kind: AddType::Add,
                        id: self.activity_id("add")?,
                        actor: actor.inner().clone(),
                        object: target.inner().clone(),
                        target: collection,
                        published: *at,
                    })
                } else {
                    AnnouncableActivity::Remove(CollectionRemove {
                        kind: RemoveType::Remove,
                        id: self.activity_id("remove")?,
                        actor: actor.inner().clone(),
                        object: target.inner().clone(),
                        target: collection,
                        published: *at,
                    })
                }
            }
            ModerationAction::BanFromSite {
                actor,
                person,
                instance,
                banned,
                remove_data,
                reason,
                expires_at,
                at,
            } => {
                let block = BlockUser {
                    kind: BlockType::Block,
                    id: self.activity_id("block")?,
                    actor: actor.inner().clone(),
                    object: person.inner().clone(),
                    target: instance.base_url()?,
                    published: *at,
                    remove_data: *remove_data,
                    summary: reason.clone(),
                    expires: *expires_at,
                };
                self.block_or_undo(actor, block, *banned, *at)?
            }
            ModerationAction::BanFromCommunity {
                actor,
                person,
                community,
                banned,
                remove_data,
                reason,
                expires_at,
                at,
            } => {
                let block = BlockUser {
                    kind: BlockType::Block,
                    id: self.activity_id("block")?,
                    actor: actor.inner().clone(),
                    object: person.inner().clone(),
                    target: community.inner().clone(),
                    published: *at,
                    remove_data: *remove_data,
                    summary: reason.clone(),
                    expires: *expires_at,
                };
                self.block_or_undo(actor, block, *banned, *at)?
            }
        };
        Ok(activity)
    }

    fn block_or_undo(
        &self,
        actor: &ObjectId,
        block: BlockUser,
        banned: bool,
        at: DateTime<Utc>,
    ) -> AppResult<AnnouncableActivity> {
        Ok(if banned {
            AnnouncableActivity::Block(block)
        } else {
            AnnouncableActivity::Undo(self.undo(actor, UndoObject::Block(block), at)?)
        })
    }

    // ========== Audiences ==========

    /// Creator home plus every instance hosting a moderator of the community.
    async fn moderation_extra(&self, post: &Post) -> AppResult<BTreeSet<InstanceId>> {
        let community = self.store.communities.get_by_ap_id(&post.community_id).await?;
        let mut extra = self.moderator_instances(&community);
        extra.insert(post.creator_id.instance()?);
        Ok(extra)
    }

    /// Instances holding a copy of anything `person` posted.
    async fn site_ban_audience(&self, person: &ObjectId) -> AppResult<BTreeSet<InstanceId>> {
        let mut recipients = BTreeSet::from([person.instance()?]);
        let posts = self
            .store
            .posts
            .list(&PostFilter {
                creator_id: Some(person.clone()),
                ..PostFilter::default()
            })
            .await?;
        let communities: BTreeSet<ObjectId> = posts.into_iter().map(|p| p.community_id).collect();
        for community_id in communities {
            recipients.insert(community_id.instance()?);
            if let Some(community) = self.store.communities.find_by_ap_id(&community_id).await?
                && community.local
            {
                recipients.extend(self.follower_instances(&community).await?);
            }
        }
        Ok(recipients)
    }

    /// Community home, creator home and moderator instances of a report.
    async fn report_audience(&self, report: &Report) -> AppResult<BTreeSet<InstanceId>> {
        let mut recipients = BTreeSet::from([
            report.community_id.instance()?,
            report.creator_id.instance()?,
        ]);
        if let Some(community) = self
            .store
            .communities
            .find_by_ap_id(&report.community_id)
            .await?
        {
            recipients.extend(self.moderator_instances(&community));
        }
        Ok(recipients)
    }

    // ========== Dispatch ==========

    async fn send_page(
        &self,
        kind: CreateOrUpdateType,
        post: &Post,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let id_kind = match kind {
            CreateOrUpdateType::Create => "create",
            CreateOrUpdateType::Update => "update",
        };
        let activity = CreateOrUpdatePage::new(
            kind,
            self.activity_id(id_kind)?,
            post.creator_id.inner().clone(),
            post.to_ap_page(),
            at,
        );
        self.to_community(
            &post.community_id,
            AnnouncableActivity::CreateOrUpdate(activity),
            BTreeSet::new(),
        )
        .await
    }

    async fn send(&self, announcement: Announcement) -> AppResult<()> {
        match announcement {
            Announcement::CreatePost { post } => {
                self.send_page(CreateOrUpdateType::Create, &post, post.published_at)
                    .await
            }
            Announcement::UpdatePost { post } => {
                let at = post.updated_at.unwrap_or(post.published_at);
                self.send_page(CreateOrUpdateType::Update, &post, at).await
            }

            Announcement::Moderation {
                action,
                post: Some(post),
            } => {
                let activity = self.moderation_activity(&action, Some(&post))?;
                let extra = self.moderation_extra(&post).await?;
                self.to_community(&post.community_id, activity, extra).await
            }

            Announcement::Moderation { action, post: None } => {
                let activity = self.moderation_activity(&action, None)?;
                match &action {
                    ModerationAction::BanFromSite { person, .. } => {
                        let recipients = self.site_ban_audience(person).await?;
                        self.deliver(&activity, recipients).await
                    }
                    ModerationAction::BanFromCommunity {
                        person, community, ..
                    } => {
                        let extra = BTreeSet::from([person.instance()?]);
                        self.to_community(community, activity, extra).await
                    }
                    other => Err(AppError::Internal(format!(
                        "{} without post",
                        other.name()
                    ))),
                }
            }

            Announcement::Vote {
                actor,
                post,
                score,
                at,
            } => {
                let vote = VoteActivity {
                    kind: VoteType::from_score(score),
                    id: self.activity_id("vote")?,
                    actor: actor.inner().clone(),
                    object: post.ap_id.inner().clone(),
                    audience: post.community_id.inner().clone(),
                    published: at,
                };
                let activity = if score == 0 {
                    AnnouncableActivity::Undo(self.undo(&actor, UndoObject::Vote(vote), at)?)
                } else {
                    AnnouncableActivity::Vote(vote)
                };
                self.to_community(&post.community_id, activity, BTreeSet::new())
                    .await
            }

            Announcement::Moderator {
                actor,
                community,
                moderator,
                added,
                at,
            } => {
                let target = moderators_url(community.ap_id.inner());
                let activity = if added {
                    AnnouncableActivity::Add(CollectionAdd {
                        kind: AddType::Add,
                        id: self.activity_id("add")?,
                        actor: actor.inner().clone(),
                        object: moderator.inner().clone(),
                        target,
                        published: at,
                    })
                } else {
                    AnnouncableActivity::Remove(CollectionRemove {
                        kind: RemoveType::Remove,
                        id: self.activity_id("remove")?,
                        actor: actor.inner().clone(),
                        object: moderator.inner().clone(),
                        target,
                        published: at,
                    })
                };
                let extra = BTreeSet::from([moderator.instance()?]);
                self.to_community(&community.ap_id, activity, extra).await
            }

            Announcement::Report { report } => {
                let recipients = self.report_audience(&report).await?;
                self.deliver(&self.report_activity(&report), recipients)
                    .await
            }

            Announcement::ResolveReport {
                actor,
                report,
                resolved,
                at,
            } => {
                let mut recipients = self.report_audience(&report).await?;
                recipients.insert(report.reporter_id.instance()?);
                let resolve = ResolveReport {
                    kind: ResolveType::Resolve,
                    id: self.activity_id("resolve")?,
                    actor: actor.inner().clone(),
                    object: self.report_activity(&report),
                    published: at,
                };
                if resolved {
                    self.deliver(&resolve, recipients).await
                } else {
                    let undo = self.undo(&actor, UndoObject::Resolve(resolve), at)?;
                    self.deliver(&undo, recipients).await
                }
            }

            Announcement::Follow {
                follower,
                community,
                follow,
            } => {
                let recipients = BTreeSet::from([community.instance()?]);
                let activity = FollowActivity::new(
                    self.activity_id("follow")?,
                    follower.inner().clone(),
                    community.inner().clone(),
                    Utc::now(),
                );
                if follow {
                    self.deliver(&activity, recipients).await
                } else {
                    let undo =
                        self.undo(&follower, UndoObject::Follow(activity), Utc::now())?;
                    self.deliver(&undo, recipients).await
                }
            }

            Announcement::AcceptFollow {
                follower,
                community,
            } => {
                let recipients = BTreeSet::from([follower.instance()?]);
                let accept = AcceptActivity {
                    kind: AcceptType::Accept,
                    id: self.activity_id("accept")?,
                    actor: community.inner().clone(),
                    object: FollowActivity::new(
                        self.activity_id("follow")?,
                        follower.inner().clone(),
                        community.inner().clone(),
                        Utc::now(),
                    ),
                    published: Utc::now(),
                };
                self.deliver(&accept, recipients).await
            }
        }
    }
}

#[async_trait]
impl Announcer for OutboundAnnouncer {
    async fn announce(&self, announcement: Announcement) -> AppResult<()> {
        let name = announcement.name();
        self.send(announcement).await.inspect_err(|e| {
            tracing::warn!(announcement = name, error = %e, "Failed to build outbound activity");
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::delivery::{CollectingQueue, activity_type};
    use fedsync_common::config::PolicyConfig;
    use fedsync_db::entities::RemovalSource;
    use fedsync_db::test_utils::{
        community_fixture, community_id, follow_fixture, person_fixture, person_id, post_fixture,
    };
    use std::sync::Arc;

    fn instance(label: &str) -> InstanceId {
        InstanceId::from_url(&Url::parse(&format!("https://{label}.example/")).unwrap()).unwrap()
    }

    /// `alpha` hosting `main`, followed from beta and gamma.
    async fn alpha() -> (OutboundAnnouncer, CollectingQueue, Store) {
        let base = Url::parse("https://alpha.example/").unwrap();
        let store = Store::new(instance("alpha"), &PolicyConfig::default());
        let mut main = community_fixture("alpha", "main", true);
        main.moderators.insert(person_id("delta", "mod"));
        store.communities.create(main).await.unwrap();
        store
            .communities
            .create(community_fixture("epsilon", "remote", false))
            .await
            .unwrap();
        for label in ["beta", "gamma"] {
            let mut follow =
                follow_fixture(&person_id(label, "reader"), &community_id("alpha", "main"));
            follow.state = fedsync_db::entities::FollowState::Accepted;
            store.follows.upsert(follow).await.unwrap();
        }
        let queue = CollectingQueue::new();
        let announcer = OutboundAnnouncer::new(store.clone(), Arc::new(queue.clone()), base).unwrap();
        (announcer, queue, store)
    }

    #[tokio::test]
    async fn test_home_create_is_announced_to_followers() {
        let (announcer, queue, _) = alpha().await;
        let post = post_fixture("https://alpha.example/post/1", "alpha", "main");

        announcer
            .announce(Announcement::CreatePost { post })
            .await
            .unwrap();

        assert_eq!(queue.types_for(&instance("beta")).await, vec!["Announce/Create"]);
        assert_eq!(queue.types_for(&instance("gamma")).await, vec!["Announce/Create"]);
        assert!(queue.types_for(&instance("alpha")).await.is_empty());
    }

    #[tokio::test]
    async fn test_remote_community_goes_to_home_only() {
        let (announcer, queue, _) = alpha().await;
        let mut post = post_fixture("https://alpha.example/post/2", "alpha", "main");
        post.community_id = community_id("epsilon", "remote");

        announcer
            .announce(Announcement::Vote {
                actor: person_id("alpha", "alice"),
                post,
                score: 0,
                at: Utc::now(),
            })
            .await
            .unwrap();

        let sent = queue.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, instance("epsilon"));
        assert_eq!(activity_type(&sent[0].1), "Undo/Like");
    }

    #[tokio::test]
    async fn test_moderation_reaches_creator_and_moderator_homes() {
        let (announcer, queue, _) = alpha().await;
        let mut post = post_fixture("https://zeta.example/post/3", "alpha", "main");
        post.creator_id = person_id("zeta", "writer");

        let action = ModerationAction::Remove {
            actor: person_id("alpha", "admin"),
            post: post.ap_id.clone(),
            removed: true,
            source: RemovalSource::Site,
            reason: Some("spam".to_string()),
            at: Utc::now(),
        };
        announcer
            .announce(Announcement::Moderation {
                action,
                post: Some(post),
            })
            .await
            .unwrap();

        for label in ["beta", "gamma", "delta", "zeta"] {
            assert_eq!(
                queue.types_for(&instance(label)).await,
                vec!["Announce/Delete"],
                "{label}"
            );
        }
        let sent = queue.sent().await;
        assert_eq!(sent[0].1["object"]["remove"], true);
        assert_eq!(sent[0].1["object"]["summary"], "spam");
    }

    #[tokio::test]
    async fn test_site_ban_reaches_mirror_holders() {
        let (announcer, queue, store) = alpha().await;
        let mut post = post_fixture("https://beta.example/post/4", "alpha", "main");
        post.creator_id = person_id("beta", "troll");
        store.posts.create(post).await.unwrap();
        store
            .persons
            .create(person_fixture("beta", "troll", false))
            .await
            .unwrap();

        let action = ModerationAction::BanFromSite {
            actor: person_id("alpha", "admin"),
            person: person_id("beta", "troll"),
            instance: instance("alpha"),
            banned: false,
            remove_data: true,
            reason: None,
            expires_at: None,
            at: Utc::now(),
        };
        announcer
            .announce(Announcement::Moderation { action, post: None })
            .await
            .unwrap();

        assert_eq!(queue.types_for(&instance("beta")).await, vec!["Undo/Block"]);
        assert_eq!(queue.types_for(&instance("gamma")).await, vec!["Undo/Block"]);
        assert!(queue.types_for(&instance("delta")).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolution_includes_reporter_but_not_self() {
        let (announcer, queue, _) = alpha().await;
        let report = Report {
            id: 1,
            ap_id: ObjectId::parse("https://theta.example/report/1").unwrap(),
            local: false,
            post_id: ObjectId::parse("https://zeta.example/post/5").unwrap(),
            community_id: community_id("alpha", "main"),
            creator_id: person_id("zeta", "writer"),
            reporter_id: person_id("theta", "reporter"),
            reason: "spam".to_string(),
            original_post_name: "A post".to_string(),
            original_post_url: None,
            original_post_body: None,
            published_at: Utc::now(),
            resolved: fedsync_db::entities::Facet::default(),
            resolver_id: None,
        };

        announcer
            .announce(Announcement::ResolveReport {
                actor: person_id("alpha", "admin"),
                report,
                resolved: true,
                at: Utc::now(),
            })
            .await
            .unwrap();

        let mut recipients: Vec<String> = queue
            .sent()
            .await
            .into_iter()
            .map(|(to, activity)| {
                assert_eq!(activity_type(&activity), "Resolve");
                to.to_string()
            })
            .collect();
        recipients.sort();
        assert_eq!(
            recipients,
            vec!["delta.example", "theta.example", "zeta.example"]
        );
    }
}
