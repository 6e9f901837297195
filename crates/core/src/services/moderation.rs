//! Moderation service: post facets, bans and community moderators.

use chrono::{DateTime, Utc};
use fedsync_common::{AppError, AppResult, InstanceId, ObjectId, PolicyViolation};
use fedsync_db::Store;
use fedsync_db::entities::{
    Community, LocalRemoval, Person, Post, PostFilter, RemovalSource,
};
use serde::Deserialize;
use validator::Validate;

use crate::authority::{Capability, resolve_capabilities};
use crate::facets::{FacetOutcome, ModerationAction, apply_to_post, write_facet};
use crate::services::delivery::{Announcement, AnnouncerService, announce_or_warn};
use crate::services::policy::PolicyFilter;

/// Input for a site or community ban.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BanInput {
    /// `true` to ban, `false` to lift the ban.
    pub ban: bool,
    /// Remove the person's content while banned.
    #[serde(default)]
    pub remove_data: bool,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reject content from a person banned where `community` lives.
pub async fn check_not_banned(
    store: &Store,
    person: &Person,
    community: &Community,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if person.is_banned_at(now) {
        return Err(PolicyViolation::SiteBan.into());
    }
    let community_home = community.ap_id.instance()?;
    if store
        .bans
        .find_instance_ban(&person.ap_id, &community_home, now)
        .await?
        .is_some()
    {
        return Err(PolicyViolation::SiteBan.into());
    }
    if store
        .bans
        .find_community_ban(&person.ap_id, &community.ap_id, now)
        .await?
        .is_some()
    {
        return Err(PolicyViolation::PersonIsBannedFromCommunity.into());
    }
    Ok(())
}

/// Moderation service.
#[derive(Clone)]
pub struct ModerationService {
    store: Store,
    policy: PolicyFilter,
    announcer: AnnouncerService,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(store: Store, policy: PolicyFilter, announcer: AnnouncerService) -> Self {
        Self {
            store,
            policy,
            announcer,
        }
    }

    // ========== Post facets ==========

    /// Lock or unlock a post.
    pub async fn lock_post(&self, actor: &Person, post_id: &ObjectId, locked: bool) -> AppResult<Post> {
        let action = ModerationAction::Lock {
            actor: actor.ap_id.clone(),
            post: post_id.clone(),
            locked,
            at: Utc::now(),
        };
        self.moderate_post(actor, action).await
    }

    /// Feature or unfeature a post in its community.
    pub async fn feature_post(
        &self,
        actor: &Person,
        post_id: &ObjectId,
        featured: bool,
    ) -> AppResult<Post> {
        let action = ModerationAction::Feature {
            actor: actor.ap_id.clone(),
            post: post_id.clone(),
            featured,
            at: Utc::now(),
        };
        self.moderate_post(actor, action).await
    }

    /// Remove or restore a post.
    ///
    /// A moderator or home admin writes the federated removal facet. A local
    /// admin without that authority only hides the post on this node.
    pub async fn remove_post(
        &self,
        actor: &Person,
        post_id: &ObjectId,
        removed: bool,
        reason: Option<String>,
    ) -> AppResult<Post> {
        let post = self.store.posts.get_by_ap_id(post_id).await?;
        let community = self
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;
        let caps = resolve_capabilities(actor, Some(&post.creator_id), &community);

        if !caps.can_moderate() && actor.local && actor.admin {
            let (post, changed) = self
                .store
                .posts
                .modify(post.id, |p| {
                    if removed {
                        p.local_removals.insert(LocalRemoval::Admin)
                    } else {
                        p.local_removals.remove(&LocalRemoval::Admin)
                    }
                })
                .await?;
            if changed {
                tracing::info!(
                    actor = %actor.ap_id,
                    object = %post.ap_id,
                    removed,
                    "Applied local-only removal"
                );
            }
            return Ok(post);
        }

        let source = if caps.has(Capability::CommunityMod) {
            RemovalSource::Community
        } else {
            RemovalSource::Site
        };
        let action = ModerationAction::Remove {
            actor: actor.ap_id.clone(),
            post: post_id.clone(),
            removed,
            source,
            reason,
            at: Utc::now(),
        };
        self.moderate_post(actor, action).await
    }

    async fn moderate_post(&self, actor: &Person, action: ModerationAction) -> AppResult<Post> {
        let Some((post_id, _, _)) = action.post_facet() else {
            return Err(AppError::Internal(format!(
                "{} is not a post action",
                action.name()
            )));
        };
        let post = self.store.posts.get_by_ap_id(post_id).await?;
        let community = self
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;

        let caps = resolve_capabilities(actor, Some(&post.creator_id), &community);
        if !action.is_authorized(&caps) {
            tracing::warn!(
                actor = %actor.ap_id,
                object = %post.ap_id,
                capabilities = %caps,
                action = action.name(),
                "Rejected unauthorized moderation"
            );
            return Err(AppError::Unauthorized(format!(
                "{} requires a moderator",
                action.name()
            )));
        }

        let (post, outcome) = self.apply_post_action(&action).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %actor.ap_id,
                object = %post.ap_id,
                action = action.name(),
                "Applied moderation"
            );
            announce_or_warn(
                &self.announcer,
                Announcement::Moderation {
                    action,
                    post: Some(post.clone()),
                },
            )
            .await;
        }
        Ok(post)
    }

    /// Apply an already-authorized post action.
    pub async fn apply_post_action(
        &self,
        action: &ModerationAction,
    ) -> AppResult<(Post, FacetOutcome)> {
        let Some((post_id, _, _)) = action.post_facet() else {
            return Err(AppError::Internal(format!(
                "{} is not a post action",
                action.name()
            )));
        };
        let post = self.store.posts.get_by_ap_id(post_id).await?;
        let (post, applied) = self
            .store
            .posts
            .modify(post.id, |p| apply_to_post(p, action).is_applied())
            .await?;
        let outcome = if applied {
            FacetOutcome::Applied
        } else {
            FacetOutcome::Stale
        };
        Ok((post, outcome))
    }

    // ========== Site bans ==========

    /// Ban or unban a person from this site. Local admins only.
    pub async fn ban_from_site(
        &self,
        actor: &Person,
        person_id: &ObjectId,
        input: BanInput,
    ) -> AppResult<Person> {
        input.validate()?;
        if !(actor.local && actor.admin) {
            return Err(AppError::Unauthorized(
                "only an admin can ban from the site".to_string(),
            ));
        }
        let instance = self.policy.local_instance().await?;
        let action = ModerationAction::BanFromSite {
            actor: actor.ap_id.clone(),
            person: person_id.clone(),
            instance,
            banned: input.ban,
            remove_data: input.remove_data,
            reason: input.reason,
            expires_at: input.expires_at,
            at: Utc::now(),
        };

        let (outcome, changed) = self.apply_ban(&action).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %actor.ap_id,
                person = %person_id,
                banned = input.ban,
                posts_changed = changed,
                "Site ban"
            );
            announce_or_warn(
                &self.announcer,
                Announcement::Moderation { action, post: None },
            )
            .await;
        }

        self.store.persons.get_by_ap_id(person_id).await
    }

    /// Apply an already-authorized ban and its content cascade.
    ///
    /// Ban state is last-writer-wins on the action timestamp, so an older ban
    /// or lift arriving late is `Stale` and cascades nothing. Also returns how
    /// many posts changed visibility.
    pub async fn apply_ban(&self, action: &ModerationAction) -> AppResult<(FacetOutcome, usize)> {
        match action {
            ModerationAction::BanFromSite {
                person,
                instance,
                banned,
                remove_data,
                reason,
                expires_at,
                at,
                ..
            } => {
                let target = self.store.persons.get_by_ap_id(person).await?;
                let home_ban = &target.home()? == instance;
                let applied = if home_ban {
                    self.store
                        .persons
                        .modify(target.id, |p| {
                            let applied = write_facet(&mut p.banned, *banned, *at).is_applied();
                            if applied {
                                p.ban_expires_at = if *banned { *expires_at } else { None };
                            }
                            applied
                        })
                        .await?
                        .1
                } else {
                    self.store
                        .bans
                        .write_instance_ban(person, instance, |ban| {
                            let applied = write_facet(&mut ban.banned, *banned, *at).is_applied();
                            if applied {
                                ban.reason.clone_from(reason);
                                ban.expires_at = *expires_at;
                            }
                            applied
                        })
                        .await?
                        .1
                };
                if !applied {
                    tracing::debug!(person = %person, instance = %instance, banned, "Stale site ban");
                    return Ok((FacetOutcome::Stale, 0));
                }

                let scope = if home_ban {
                    PostFilter {
                        creator_id: Some(person.clone()),
                        ..PostFilter::default()
                    }
                } else {
                    PostFilter {
                        creator_id: Some(person.clone()),
                        community_instance: Some(instance.clone()),
                        ..PostFilter::default()
                    }
                };
                let changed = self
                    .cascade(
                        scope,
                        LocalRemoval::SiteBan(instance.clone()),
                        *banned && *remove_data,
                        !*banned,
                    )
                    .await?;
                Ok((FacetOutcome::Applied, changed))
            }
            ModerationAction::BanFromCommunity {
                person,
                community,
                banned,
                remove_data,
                reason,
                expires_at,
                at,
                ..
            } => {
                let (_, applied) = self
                    .store
                    .bans
                    .write_community_ban(person, community, |ban| {
                        let applied = write_facet(&mut ban.banned, *banned, *at).is_applied();
                        if applied {
                            ban.reason.clone_from(reason);
                            ban.expires_at = *expires_at;
                            if *banned {
                                ban.received_ban_at = Some(Utc::now());
                            }
                        }
                        applied
                    })
                    .await?;
                if !applied {
                    tracing::debug!(person = %person, community = %community, banned, "Stale community ban");
                    return Ok((FacetOutcome::Stale, 0));
                }

                let scope = PostFilter {
                    creator_id: Some(person.clone()),
                    community_id: Some(community.clone()),
                    ..PostFilter::default()
                };
                let changed = self
                    .cascade(
                        scope,
                        LocalRemoval::CommunityBan(community.clone()),
                        *banned && *remove_data,
                        !*banned,
                    )
                    .await?;
                Ok((FacetOutcome::Applied, changed))
            }
            other => Err(AppError::Internal(format!(
                "{} is not a ban",
                other.name()
            ))),
        }
    }

    async fn cascade(
        &self,
        scope: PostFilter,
        marker: LocalRemoval,
        add: bool,
        lift: bool,
    ) -> AppResult<usize> {
        if !add && !lift {
            return Ok(0);
        }
        let mut affected = 0;
        for post in self.store.posts.list(&scope).await? {
            let (_, changed) = self
                .store
                .posts
                .modify(post.id, |p| {
                    if add {
                        p.local_removals.insert(marker.clone())
                    } else {
                        p.local_removals.remove(&marker)
                    }
                })
                .await?;
            if changed {
                affected += 1;
            }
        }
        tracing::debug!(?marker, affected, add, "Ban cascade");
        Ok(affected)
    }

    // ========== Community bans ==========

    /// Ban or unban a person from a community. Moderators and home admins only.
    pub async fn ban_from_community(
        &self,
        actor: &Person,
        person_id: &ObjectId,
        community_id: &ObjectId,
        input: BanInput,
    ) -> AppResult<Community> {
        input.validate()?;
        let community = self.store.communities.get_by_ap_id(community_id).await?;
        self.store.persons.get_by_ap_id(person_id).await?;

        let action = ModerationAction::BanFromCommunity {
            actor: actor.ap_id.clone(),
            person: person_id.clone(),
            community: community_id.clone(),
            banned: input.ban,
            remove_data: input.remove_data,
            reason: input.reason,
            expires_at: input.expires_at,
            at: Utc::now(),
        };
        let caps = resolve_capabilities(actor, None, &community);
        if !action.is_authorized(&caps) {
            return Err(AppError::Unauthorized(
                "community ban requires a moderator".to_string(),
            ));
        }

        let (outcome, changed) = self.apply_ban(&action).await?;
        if outcome.is_applied() {
            tracing::info!(
                actor = %actor.ap_id,
                person = %person_id,
                community = %community_id,
                banned = input.ban,
                posts_changed = changed,
                "Community ban"
            );
            announce_or_warn(
                &self.announcer,
                Announcement::Moderation { action, post: None },
            )
            .await;
        }

        Ok(community)
    }

    // ========== Moderators ==========

    /// Add or remove a moderator. Only on the community's home instance.
    pub async fn set_moderator(
        &self,
        actor: &Person,
        community_id: &ObjectId,
        moderator_id: &ObjectId,
        added: bool,
    ) -> AppResult<Community> {
        let community = self.store.communities.get_by_ap_id(community_id).await?;
        if !community.local {
            return Err(AppError::Unauthorized(
                "moderators are managed on the community's home instance".to_string(),
            ));
        }
        if !resolve_capabilities(actor, None, &community).can_moderate() {
            return Err(AppError::Unauthorized(
                "only a moderator can change moderators".to_string(),
            ));
        }
        self.store.persons.get_by_ap_id(moderator_id).await?;

        let (community, changed) = self.apply_moderator(&community, moderator_id, added).await?;
        if changed {
            tracing::info!(
                actor = %actor.ap_id,
                community = %community.ap_id,
                moderator = %moderator_id,
                added,
                "Changed moderators"
            );
            announce_or_warn(
                &self.announcer,
                Announcement::Moderator {
                    actor: actor.ap_id.clone(),
                    community: community.clone(),
                    moderator: moderator_id.clone(),
                    added,
                    at: Utc::now(),
                },
            )
            .await;
        }
        Ok(community)
    }

    /// Apply a moderator change. Returns whether the set changed.
    pub async fn apply_moderator(
        &self,
        community: &Community,
        moderator_id: &ObjectId,
        added: bool,
    ) -> AppResult<(Community, bool)> {
        self.store
            .communities
            .modify(community.id, |c| {
                if added {
                    c.moderators.insert(moderator_id.clone())
                } else {
                    c.moderators.remove(moderator_id)
                }
            })
            .await
    }

    /// Whether `instance` issued a ban on `person` that is in force.
    pub async fn is_banned_by(&self, person: &Person, instance: &InstanceId) -> AppResult<bool> {
        let now = Utc::now();
        if &person.home()? == instance {
            return Ok(person.is_banned_at(now));
        }
        Ok(self
            .store
            .bans
            .find_instance_ban(&person.ap_id, instance, now)
            .await?
            .is_some())
    }
}
