//! Post service.

use chrono::{DateTime, Utc};
use fedsync_common::{AppError, AppResult, IdGenerator, ObjectId, PolicyViolation};
use fedsync_db::Store;
use fedsync_db::entities::{EmbedMetadata, Facet, Person, Post, Vote};
use serde::Deserialize;
use url::Url;
use validator::Validate;

use crate::authority::resolve_capabilities;
use crate::facets::{FacetOutcome, ModerationAction, apply_to_post, write_facet};
use crate::services::delivery::{Announcement, AnnouncerService, announce_or_warn};
use crate::services::moderation::check_not_banned;
use crate::services::policy::PolicyFilter;

/// Input for creating a new post.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    pub community_id: ObjectId,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(length(max = 50000))]
    pub body: Option<String>,

    pub url: Option<Url>,

    #[serde(default)]
    pub nsfw: bool,

    #[serde(default)]
    pub embed: EmbedMetadata,
}

/// Input for editing a post. `None` leaves a field unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePostInput {
    pub post_id: ObjectId,

    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(length(max = 50000))]
    pub body: Option<String>,

    pub url: Option<Url>,

    pub nsfw: Option<bool>,

    pub embed: Option<EmbedMetadata>,
}

impl UpdatePostInput {
    /// An edit that changes nothing yet.
    #[must_use]
    pub const fn new(post_id: ObjectId) -> Self {
        Self {
            post_id,
            name: None,
            body: None,
            url: None,
            nsfw: None,
            embed: None,
        }
    }
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    store: Store,
    policy: PolicyFilter,
    announcer: AnnouncerService,
    base_url: Url,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        store: Store,
        policy: PolicyFilter,
        announcer: AnnouncerService,
        base_url: Url,
    ) -> Self {
        Self {
            store,
            policy,
            announcer,
            base_url,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a post by identifier.
    pub async fn get(&self, post_id: &ObjectId) -> AppResult<Post> {
        self.store.posts.get_by_ap_id(post_id).await
    }

    /// Node-local permalink of a post.
    pub fn permalink(&self, post: &Post) -> AppResult<Url> {
        Ok(self.base_url.join(&format!("post/{}", post.id))?)
    }

    /// Create a post as a local person.
    pub async fn create(&self, actor: &Person, input: CreatePostInput) -> AppResult<Post> {
        input.validate()?;

        let community = self
            .store
            .communities
            .get_by_ap_id(&input.community_id)
            .await?;
        if !community.is_open() {
            return Err(PolicyViolation::CommunityRemoved.into());
        }
        check_not_banned(&self.store, actor, &community, Utc::now()).await?;
        self.policy
            .check_local_post(input.url.as_ref(), input.nsfw)
            .await?;

        let now = Utc::now();
        let post = Post {
            id: 0,
            ap_id: self.id_gen.object_id(&self.base_url, "post")?,
            local: true,
            name: input.name,
            body: input.body,
            url: input.url,
            nsfw: input.nsfw,
            embed: input.embed,
            creator_id: actor.ap_id.clone(),
            community_id: community.ap_id.clone(),
            published_at: now,
            updated_at: None,
            locked: Facet::default(),
            removed: Facet::default(),
            removed_by: None,
            deleted: Facet::default(),
            featured_community: Facet::default(),
            local_removals: Default::default(),
            score: 0,
        };
        let post = self.store.posts.create(post).await?;
        let post = self.record_vote(&post, &actor.ap_id, 1, now).await?;

        tracing::info!(
            actor = %actor.ap_id,
            object = %post.ap_id,
            community = %community.ap_id,
            "Created post"
        );
        announce_or_warn(
            &self.announcer,
            Announcement::CreatePost { post: post.clone() },
        )
        .await;

        Ok(post)
    }

    /// Edit a post. Only the creator may edit.
    pub async fn update(&self, actor: &Person, input: UpdatePostInput) -> AppResult<Post> {
        input.validate()?;

        let post = self.store.posts.get_by_ap_id(&input.post_id).await?;
        if post.creator_id != actor.ap_id {
            return Err(AppError::Unauthorized(
                "only the creator can edit a post".to_string(),
            ));
        }
        let url = input.url.as_ref().or(post.url.as_ref());
        let nsfw = input.nsfw.unwrap_or(post.nsfw);
        self.policy.check_local_post(url, nsfw).await?;

        let now = Utc::now();
        let (post, _) = self
            .store
            .posts
            .modify(post.id, |p| {
                if let Some(name) = input.name {
                    p.name = name;
                }
                if let Some(body) = input.body {
                    p.body = Some(body);
                }
                if let Some(url) = input.url {
                    p.url = Some(url);
                }
                if let Some(embed) = input.embed {
                    p.embed = embed;
                }
                p.nsfw = nsfw;
                p.updated_at = Some(now);
                true
            })
            .await?;

        tracing::info!(actor = %actor.ap_id, object = %post.ap_id, "Updated post");
        announce_or_warn(
            &self.announcer,
            Announcement::UpdatePost { post: post.clone() },
        )
        .await;

        Ok(post)
    }

    /// Delete or restore a post. The creator or an admin of the creator's
    /// instance may do this.
    pub async fn delete(&self, actor: &Person, post_id: &ObjectId, deleted: bool) -> AppResult<Post> {
        let post = self.store.posts.get_by_ap_id(post_id).await?;
        let community = self
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;

        let action = ModerationAction::Delete {
            actor: actor.ap_id.clone(),
            post: post.ap_id.clone(),
            deleted,
            at: Utc::now(),
        };
        let caps = resolve_capabilities(actor, Some(&post.creator_id), &community);
        if !action.is_authorized(&caps) {
            return Err(AppError::Unauthorized(
                "only the creator or their admin can delete a post".to_string(),
            ));
        }

        let (post, applied) = self
            .store
            .posts
            .modify(post.id, |p| apply_to_post(p, &action).is_applied())
            .await?;
        if applied {
            tracing::info!(actor = %actor.ap_id, object = %post.ap_id, deleted, "Deleted post");
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

    /// Vote on a post: `1`, `-1`, or `0` to retract.
    pub async fn vote(&self, actor: &Person, post_id: &ObjectId, score: i16) -> AppResult<Post> {
        if !matches!(score, -1..=1) {
            return Err(AppError::Validation(format!("invalid vote score {score}")));
        }
        let post = self.store.posts.get_by_ap_id(post_id).await?;
        let community = self
            .store
            .communities
            .get_by_ap_id(&post.community_id)
            .await?;
        check_not_banned(&self.store, actor, &community, Utc::now()).await?;

        let now = Utc::now();
        let post = self.record_vote(&post, &actor.ap_id, score, now).await?;

        tracing::info!(actor = %actor.ap_id, object = %post.ap_id, score, "Voted on post");
        announce_or_warn(
            &self.announcer,
            Announcement::Vote {
                actor: actor.ap_id.clone(),
                post: post.clone(),
                score,
                at: now,
            },
        )
        .await;

        Ok(post)
    }

    /// Record a vote and recompute the post's score from local vote records.
    pub async fn record_vote(
        &self,
        post: &Post,
        person: &ObjectId,
        score: i16,
        at: DateTime<Utc>,
    ) -> AppResult<Post> {
        if score == 0 {
            self.store.votes.delete(person, &post.ap_id).await?;
        } else {
            self.store
                .votes
                .upsert(Vote {
                    id: 0,
                    person_id: person.clone(),
                    post_id: post.ap_id.clone(),
                    score,
                    published_at: at,
                })
                .await?;
        }

        let total = self.store.votes.score(&post.ap_id).await?;
        let (post, _) = self
            .store
            .posts
            .modify(post.id, |p| {
                let changed = p.score != total;
                p.score = total;
                changed
            })
            .await?;
        Ok(post)
    }

    /// Insert or refresh a mirror of a remote post.
    ///
    /// Content fields follow the newest edit timestamp. Facets carried by the
    /// incoming copy merge through the usual last-writer-wins rule. A new
    /// mirror starts with the creator's implicit upvote.
    pub async fn upsert_mirror(&self, incoming: Post) -> AppResult<(Post, FacetOutcome)> {
        let existing = match self.store.posts.find_by_ap_id(&incoming.ap_id).await? {
            Some(existing) => existing,
            None => {
                let created = self
                    .store
                    .posts
                    .create(Post {
                        local: false,
                        score: 0,
                        local_removals: Default::default(),
                        ..incoming.clone()
                    })
                    .await;
                match created {
                    Ok(post) => {
                        let post = self
                            .record_vote(&post, &incoming.creator_id, 1, incoming.published_at)
                            .await?;
                        return Ok((post, FacetOutcome::Applied));
                    }
                    // Inserted concurrently; merge into that copy instead.
                    Err(AppError::Conflict(_)) => {
                        self.store.posts.get_by_ap_id(&incoming.ap_id).await?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let (post, changed) = self
            .store
            .posts
            .modify(existing.id, |p| merge_mirror(p, &incoming))
            .await?;
        let outcome = if changed {
            FacetOutcome::Applied
        } else {
            FacetOutcome::Stale
        };
        Ok((post, outcome))
    }
}

fn edited_at(post: &Post) -> DateTime<Utc> {
    post.updated_at.unwrap_or(post.published_at)
}

fn merge_mirror(current: &mut Post, incoming: &Post) -> bool {
    let mut changed = false;

    if edited_at(incoming) > edited_at(current) {
        current.name = incoming.name.clone();
        current.body = incoming.body.clone();
        current.url = incoming.url.clone();
        current.nsfw = incoming.nsfw;
        current.embed = incoming.embed.clone();
        current.updated_at = incoming.updated_at;
        changed = true;
    }

    for (facet, theirs) in [
        (&mut current.locked, incoming.locked),
        (&mut current.deleted, incoming.deleted),
        (&mut current.featured_community, incoming.featured_community),
    ] {
        if let Some(at) = theirs.updated_at {
            changed |= write_facet(facet, theirs.value, at).is_applied();
        }
    }
    if let Some(at) = incoming.removed.updated_at
        && write_facet(&mut current.removed, incoming.removed.value, at).is_applied()
    {
        current.removed_by = incoming.removed_by;
        changed = true;
    }

    changed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::delivery::testing::RecordingAnnouncer;
    use crate::services::testing::{alpha_store, local_person};
    use chrono::Duration;
    use std::sync::Arc;

    fn input(community: &ObjectId, name: &str) -> CreatePostInput {
        CreatePostInput {
            community_id: community.clone(),
            name: name.to_string(),
            body: Some("body".to_string()),
            url: None,
            nsfw: false,
            embed: EmbedMetadata::default(),
        }
    }

    async fn service() -> (PostService, Store, RecordingAnnouncer, ObjectId) {
        let (store, policy, community) = alpha_store().await;
        let announcer = RecordingAnnouncer::default();
        let service = PostService::new(
            store.clone(),
            policy,
            Arc::new(announcer.clone()),
            Url::parse("https://alpha.example/").unwrap(),
        );
        (service, store, announcer, community)
    }

    #[tokio::test]
    async fn test_create_starts_with_score_one() {
        let (service, store, announcer, community) = service().await;
        let alice = local_person(&store, "alice").await;

        let post = service.create(&alice, input(&community, "Hello")).await.unwrap();

        assert!(post.local);
        assert_eq!(post.score, 1);
        assert!(post.ap_id.as_str().starts_with("https://alpha.example/post/"));
        assert_eq!(
            service.permalink(&post).unwrap().as_str(),
            format!("https://alpha.example/post/{}", post.id)
        );
        assert_eq!(announcer.names().await, vec!["create_post"]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_name() {
        let (service, store, announcer, community) = service().await;
        let alice = local_person(&store, "alice").await;

        let err = service
            .create(&alice, input(&community, &"x".repeat(201)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(announcer.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_blocked_url_rejected_before_federation() {
        let (service, store, announcer, community) = service().await;
        let alice = local_person(&store, "alice").await;
        service
            .policy
            .set_blocked_urls(vec!["https://evil.com/".to_string()])
            .await
            .unwrap();

        let mut blocked = input(&community, "Evil");
        blocked.url = Some(Url::parse("https://evil.com/page").unwrap());
        let err = service.create(&alice, blocked).await.unwrap_err();

        assert_eq!(err.error_code(), "blocked_url");
        assert!(announcer.names().await.is_empty());
        assert_eq!(store.posts.list(&Default::default()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_only_creator_edits_and_deletes() {
        let (service, store, _, community) = service().await;
        let alice = local_person(&store, "alice").await;
        let mallory = local_person(&store, "mallory").await;
        let post = service.create(&alice, input(&community, "Mine")).await.unwrap();

        let edit = UpdatePostInput {
            name: Some("Theirs".to_string()),
            ..UpdatePostInput::new(post.ap_id.clone())
        };
        assert!(matches!(
            service.update(&mallory, edit.clone()).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service.delete(&mallory, &post.ap_id, true).await,
            Err(AppError::Unauthorized(_))
        ));

        let edited = service.update(&alice, edit).await.unwrap();
        assert_eq!(edited.name, "Theirs");
        assert!(edited.updated_at.is_some());

        let deleted = service.delete(&alice, &post.ap_id, true).await.unwrap();
        assert!(deleted.is_deleted());
        let restored = service.delete(&alice, &post.ap_id, false).await.unwrap();
        assert!(!restored.is_deleted());
    }

    #[tokio::test]
    async fn test_home_admin_deletes_for_creator() {
        let (service, store, announcer, community) = service().await;
        let alice = local_person(&store, "alice").await;
        let (root, _) = store
            .persons
            .modify(local_person(&store, "root").await.id, |p| {
                p.admin = true;
                true
            })
            .await
            .unwrap();
        let post = service.create(&alice, input(&community, "Spam")).await.unwrap();

        let deleted = service.delete(&root, &post.ap_id, true).await.unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(announcer.names().await, vec!["create_post", "delete"]);
        assert!(matches!(
            service
                .update(&root, UpdatePostInput::new(post.ap_id.clone()))
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_votes_aggregate_locally() {
        let (service, store, _, community) = service().await;
        let alice = local_person(&store, "alice").await;
        let bob = local_person(&store, "bob").await;
        let post = service.create(&alice, input(&community, "Vote")).await.unwrap();

        assert_eq!(service.vote(&bob, &post.ap_id, -1).await.unwrap().score, 0);
        assert_eq!(service.vote(&bob, &post.ap_id, 1).await.unwrap().score, 2);
        assert_eq!(service.vote(&bob, &post.ap_id, 0).await.unwrap().score, 1);
        assert!(service.vote(&bob, &post.ap_id, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_mirror_keeps_newest_edit() {
        let (service, _, _, _) = service().await;
        let t0 = Utc::now();
        let mut remote = fedsync_db::test_utils::post_fixture(
            "https://beta.example/post/x",
            "beta",
            "main",
        );
        remote.local = true;
        remote.published_at = t0;

        let (mirror, outcome) = service.upsert_mirror(remote.clone()).await.unwrap();
        assert!(outcome.is_applied());
        assert!(!mirror.local);
        assert_eq!(mirror.score, 1);

        let mut edited = remote.clone();
        edited.name = "Edited".to_string();
        edited.updated_at = Some(t0 + Duration::seconds(10));
        service.upsert_mirror(edited.clone()).await.unwrap();

        let mut older = remote.clone();
        older.name = "Older".to_string();
        older.updated_at = Some(t0 + Duration::seconds(5));
        let (mirror, outcome) = service.upsert_mirror(older).await.unwrap();
        assert_eq!(outcome, FacetOutcome::Stale);
        assert_eq!(mirror.name, "Edited");

        let (_, outcome) = service.upsert_mirror(edited).await.unwrap();
        assert_eq!(outcome, FacetOutcome::Stale);
    }
}
