//! Resolving object references that are not known locally.
//!
//! Every failure surfaces as the same opaque not-found error: a blocked
//! origin, a missing visibility path, a failed fetch and a timeout all look
//! like an object that does not exist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fedsync_common::{AppError, AppResult, InstanceId, ObjectId};
use fedsync_core::{PolicyFilter, PostService};
use fedsync_db::Store;
use fedsync_db::entities::{Community, Person, Post};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::de::DeserializeOwned;
use url::Url;

use crate::convert::{ApGroupExt, ApPageExt, ApPersonExt, parse_permalink, rewrite_post_links};
use crate::fetch::{FetchResponse, ObjectFetcher};
use crate::objects::{ApFacet, ApFeaturedCollection, ApGroup, ApPage, ApPerson};

type InflightFetch = Shared<BoxFuture<'static, FetchResponse>>;

/// Drops the in-flight entry once its caller finishes or gives up.
struct InflightGuard<'a> {
    inflight: &'a Mutex<HashMap<Url, InflightFetch>>,
    url: &'a Url,
    fetch: InflightFetch,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight.get(self.url).is_some_and(|f| f.ptr_eq(&self.fetch)) {
            inflight.remove(self.url);
        }
    }
}

/// Resolver for posts, communities and persons.
#[derive(Clone)]
pub struct Resolver {
    store: Store,
    policy: PolicyFilter,
    posts: PostService,
    fetcher: Arc<dyn ObjectFetcher>,
    base_url: Url,
    instance: InstanceId,
    resolve_timeout: Duration,
    fetch_timeout: Duration,
    inflight: Arc<Mutex<HashMap<Url, InflightFetch>>>,
    fetches: Arc<AtomicUsize>,
}

impl Resolver {
    /// Create a new resolver.
    pub fn new(
        store: Store,
        policy: PolicyFilter,
        posts: PostService,
        fetcher: Arc<dyn ObjectFetcher>,
        base_url: Url,
        resolve_timeout: Duration,
        fetch_timeout: Duration,
    ) -> AppResult<Self> {
        let instance = InstanceId::from_url(&base_url)?;
        Ok(Self {
            store,
            policy,
            posts,
            fetcher,
            base_url,
            instance,
            resolve_timeout,
            fetch_timeout,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            fetches: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of remote fetches actually issued.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    // ========== Posts ==========

    /// Resolve a post by canonical identifier or node-local permalink.
    pub async fn resolve_post(&self, url: &Url) -> AppResult<Post> {
        match tokio::time::timeout(self.resolve_timeout, self.resolve_post_hops(url, 0)).await {
            Ok(Ok(post)) => Ok(post),
            Ok(Err(e)) => {
                tracing::debug!(object = %url, error = %e, "Post resolution failed");
                Err(AppError::opaque_not_found())
            }
            Err(_) => {
                tracing::warn!(object = %url, "Post resolution timed out");
                Err(AppError::opaque_not_found())
            }
        }
    }

    async fn resolve_post_hops(&self, url: &Url, hops: u8) -> AppResult<Post> {
        if let Some(post) = self.find_local_post(url).await? {
            return self.visible(post).await;
        }
        let origin = InstanceId::from_url(url)?;
        if origin == self.instance {
            return Err(AppError::opaque_not_found());
        }
        if self.policy.is_blocked_instance(&origin).await? {
            tracing::debug!(object = %url, instance = %origin, "Refusing to resolve from blocked instance");
            return Err(AppError::opaque_not_found());
        }

        match self.fetch(url).await {
            FetchResponse::Object(value) => {
                let page: ApPage = parse_object(value)?;
                if InstanceId::from_url(&page.id)? != origin {
                    tracing::warn!(object = %url, id = %page.id, "Fetched page is not served by its origin");
                    return Err(AppError::opaque_not_found());
                }
                if let Some(post) = self.find_local_post(&page.id).await? {
                    return self.visible(post).await;
                }
                self.store_page(page).await
            }
            FetchResponse::Redirect(target) if hops == 0 => {
                tracing::debug!(object = %url, target = %target, "Following redirect");
                Box::pin(self.resolve_post_hops(&target, 1)).await
            }
            FetchResponse::Redirect(target) => {
                tracing::debug!(object = %url, target = %target, "Refusing second redirect");
                Err(AppError::opaque_not_found())
            }
            FetchResponse::NotFound => Err(AppError::opaque_not_found()),
        }
    }

    async fn find_local_post(&self, url: &Url) -> AppResult<Option<Post>> {
        let ap_id = ObjectId::new(url.clone());
        if let Some(post) = self.store.posts.find_by_ap_id(&ap_id).await? {
            return Ok(Some(post));
        }
        match parse_permalink(&self.base_url, url) {
            Some(local_key) => self.store.posts.find_by_id(local_key).await,
            None => Ok(None),
        }
    }

    async fn visible(&self, post: Post) -> AppResult<Post> {
        if self.policy.is_visible(&post).await? {
            Ok(post)
        } else {
            Err(AppError::opaque_not_found())
        }
    }

    /// Store a fetched page as a mirror once its community resolves and this
    /// node has a visibility path into the community.
    async fn store_page(&self, page: ApPage) -> AppResult<Post> {
        let community = self.resolve_community(&page.audience).await?;
        if !self.has_visibility_path(&community).await? {
            tracing::debug!(
                object = %page.id,
                community = %community.ap_id,
                "No local follower or moderator of community"
            );
            return Err(AppError::opaque_not_found());
        }
        self.store_mirror(page).await
    }

    /// Store a fetched page as a mirror once its creator resolves.
    async fn store_mirror(&self, mut page: ApPage) -> AppResult<Post> {
        self.resolve_person(&page.attributed_to).await?;
        if page.sensitive && !self.policy.snapshot().await?.allows_nsfw() {
            return Err(AppError::opaque_not_found());
        }

        if let Some(content) = page.content.take() {
            page.content =
                Some(rewrite_post_links(&content, &self.store.posts, &self.base_url).await?);
        }
        let (post, outcome) = self.posts.upsert_mirror(page.to_post()?).await?;
        if outcome.is_applied() {
            tracing::info!(object = %post.ap_id, "Stored fetched post");
        }
        self.visible(post).await
    }

    /// Whether a local person follows or moderates `community`.
    pub async fn has_visibility_path(&self, community: &Community) -> AppResult<bool> {
        if community.local {
            return Ok(true);
        }
        let is_local = |id: &ObjectId| id.instance().is_ok_and(|i| i == self.instance);
        if community.moderators.iter().any(is_local) {
            return Ok(true);
        }
        Ok(self
            .store
            .follows
            .find_by_community(&community.ap_id)
            .await?
            .iter()
            .any(|f| is_local(&f.follower_id)))
    }

    // ========== Actors ==========

    /// Resolve a community.
    pub async fn resolve_community(&self, url: &Url) -> AppResult<Community> {
        let ap_id = ObjectId::new(url.clone());
        if let Some(community) = self.store.communities.find_by_ap_id(&ap_id).await? {
            return Ok(community);
        }
        let group: ApGroup = self.fetch_remote(url).await?;
        if group.id != *url {
            return Err(AppError::opaque_not_found());
        }
        let community = self.store.communities.upsert(group.to_community()?).await?;
        tracing::info!(community = %community.ap_id, "Stored fetched community");
        match self.load_featured(&community, &group.featured).await {
            Ok(0) => {}
            Ok(count) => {
                tracing::info!(community = %community.ap_id, count, "Loaded featured posts");
            }
            Err(e) => {
                tracing::debug!(community = %community.ap_id, error = %e, "Featured posts unavailable");
            }
        }
        Ok(community)
    }

    /// Store the featured posts of a community just fetched. Content is taken
    /// from each post's origin; the featured flag from the community.
    async fn load_featured(&self, community: &Community, featured: &Url) -> AppResult<usize> {
        let community_origin = community.ap_id.instance()?;
        if !community.is_open() || InstanceId::from_url(featured)? != community_origin {
            return Ok(0);
        }
        let collection: ApFeaturedCollection = self.fetch_remote(featured).await?;
        if collection.id != *featured {
            return Err(AppError::opaque_not_found());
        }

        let mut stored = 0;
        for listed in collection.ordered_items {
            if listed.audience != *community.ap_id.inner() {
                continue;
            }
            let stickied = ApFacet {
                value: true,
                updated: listed.stickied.map_or(listed.published, |f| f.updated),
            };
            let id = listed.id.clone();
            let mut page = if InstanceId::from_url(&id)? == community_origin {
                listed
            } else {
                match self.fetch_remote::<ApPage>(&id).await {
                    Ok(page) if page.id == id && page.audience == listed.audience => page,
                    Ok(_) => {
                        tracing::warn!(object = %id, "Featured post differs at its origin");
                        continue;
                    }
                    Err(e) => {
                        tracing::debug!(object = %id, error = %e, "Skipped featured post");
                        continue;
                    }
                }
            };
            page.stickied = Some(stickied);
            match self.store_mirror(page).await {
                Ok(_) => stored += 1,
                Err(e) => tracing::debug!(object = %id, error = %e, "Skipped featured post"),
            }
        }
        Ok(stored)
    }

    /// Resolve a person.
    pub async fn resolve_person(&self, url: &Url) -> AppResult<Person> {
        let ap_id = ObjectId::new(url.clone());
        if let Some(person) = self.store.persons.find_by_ap_id(&ap_id).await? {
            return Ok(person);
        }
        let actor: ApPerson = self.fetch_remote(url).await?;
        if actor.id != *url {
            return Err(AppError::opaque_not_found());
        }
        let person = self.store.persons.upsert(actor.to_person()?).await?;
        tracing::info!(actor = %person.ap_id, "Stored fetched person");
        Ok(person)
    }

    async fn fetch_remote<T: DeserializeOwned>(&self, url: &Url) -> AppResult<T> {
        let origin = InstanceId::from_url(url)?;
        if origin == self.instance || self.policy.is_blocked_instance(&origin).await? {
            return Err(AppError::opaque_not_found());
        }
        let fetched = tokio::time::timeout(self.resolve_timeout, self.fetch(url))
            .await
            .map_err(|_| AppError::opaque_not_found())?;
        match fetched {
            FetchResponse::Object(value) => parse_object(value),
            FetchResponse::Redirect(_) | FetchResponse::NotFound => {
                Err(AppError::opaque_not_found())
            }
        }
    }

    // ========== Fetching ==========

    /// Fetch `url`, sharing one request among concurrent callers.
    async fn fetch(&self, url: &Url) -> FetchResponse {
        let guard = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            let fetch = if let Some(existing) = inflight.get(url) {
                tracing::debug!(object = %url, "Joining in-flight fetch");
                existing.clone()
            } else {
                let fetch = self.start_fetch(url.clone());
                inflight.insert(url.clone(), fetch.clone());
                fetch
            };
            InflightGuard {
                inflight: &self.inflight,
                url,
                fetch,
            }
        };

        guard.fetch.clone().await
    }

    fn start_fetch(&self, url: Url) -> InflightFetch {
        let fetcher = self.fetcher.clone();
        let requester = self.instance.clone();
        let timeout = self.fetch_timeout;
        self.fetches.fetch_add(1, Ordering::Relaxed);

        async move {
            match tokio::time::timeout(timeout, fetcher.fetch(&url, &requester)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(object = %url, error = %e, "Fetch failed");
                    FetchResponse::NotFound
                }
                Err(_) => {
                    tracing::warn!(object = %url, "Fetch timed out");
                    FetchResponse::NotFound
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn parse_object<T: DeserializeOwned>(value: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!(error = %e, "Unexpected object shape");
        AppError::opaque_not_found()
    })
}
