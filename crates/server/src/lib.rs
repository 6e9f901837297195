//! Node assembly for fedsync.
//!
//! A [`Node`] is one autonomous server: its store, its local-intent services
//! and its federation endpoints. The binary serves one node over HTTP; tests
//! wire several together in-process.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use chrono::Utc;
use fedsync_common::{AppResult, Config, InstanceId, ObjectId};
use fedsync_core::{
    FollowResult, FollowingService, InstanceService, ModerationService, PolicyFilter,
    PostService, ReportService,
};
use fedsync_db::Store;
use fedsync_db::entities::{Community, Facet, Person, Post};
use fedsync_federation::{
    DeliveryQueueService, FederationContext, FederationState, InboxProcessor, ObjectFetcher,
    ObjectServer, OutboundAnnouncer, ResolveTimeouts, inbox_handler, object_handler,
};
use tower_http::trace::TraceLayer;
use url::Url;

/// One federated node.
#[derive(Clone)]
#[allow(missing_docs)]
pub struct Node {
    pub base_url: Url,
    pub instance: InstanceId,
    pub store: Store,
    pub policy: PolicyFilter,
    pub posts: PostService,
    pub moderation: ModerationService,
    pub reports: ReportService,
    pub following: FollowingService,
    pub site: InstanceService,
    pub federation: FederationContext,
    pub inbox: InboxProcessor,
    pub objects: ObjectServer,
}

impl Node {
    /// Assemble a node from its configuration, delivering through `queue` and
    /// fetching through `fetcher`.
    pub fn new(
        config: &Config,
        queue: DeliveryQueueService,
        fetcher: Arc<dyn ObjectFetcher>,
    ) -> AppResult<Self> {
        let base_url = config.server.base_url()?;
        let instance = InstanceId::from_url(&base_url)?;
        let store = Store::new(instance.clone(), &config.policy);
        let policy = PolicyFilter::new(store.local_site.clone(), config.policy.cache_ttl());

        let outbound = OutboundAnnouncer::new(store.clone(), queue, base_url.clone())?;
        let federation = FederationContext::new(
            store.clone(),
            policy.clone(),
            outbound,
            fetcher,
            base_url.clone(),
            ResolveTimeouts {
                resolve: config.federation.resolve_timeout(),
                fetch: config.federation.fetch_timeout(),
            },
        )?;

        tracing::info!(
            instance = %instance,
            name = %config.federation.instance_name,
            "Node assembled"
        );

        Ok(Self {
            posts: federation.posts.clone(),
            moderation: federation.moderation.clone(),
            reports: federation.reports.clone(),
            following: federation.following.clone(),
            site: InstanceService::new(policy.clone()),
            inbox: InboxProcessor::new(federation.clone()),
            objects: ObjectServer::new(store.clone(), policy.clone(), base_url.clone()),
            federation,
            base_url,
            instance,
            store,
            policy,
        })
    }

    /// HTTP surface: the shared inbox and object fetches.
    pub fn router(&self) -> Router {
        let state = FederationState {
            inbox: self.inbox.clone(),
            objects: self.objects.clone(),
        };
        Router::new()
            .route("/inbox", post(inbox_handler))
            .route("/{*path}", get(object_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Create a local person. Registration itself happens elsewhere.
    pub async fn add_person(&self, name: &str, admin: bool) -> AppResult<Person> {
        let person = self
            .store
            .persons
            .create(Person {
                id: 0,
                ap_id: ObjectId::new(self.base_url.join(&format!("u/{name}"))?),
                name: name.to_string(),
                local: true,
                admin,
                banned: Facet::default(),
                ban_expires_at: None,
                published_at: Utc::now(),
            })
            .await?;
        tracing::info!(actor = %person.ap_id, admin, "Added person");
        Ok(person)
    }

    /// Create a local community moderated by `owner`.
    pub async fn add_community(&self, owner: &Person, name: &str) -> AppResult<Community> {
        let community = self
            .store
            .communities
            .create(Community {
                id: 0,
                ap_id: ObjectId::new(self.base_url.join(&format!("c/{name}"))?),
                name: name.to_string(),
                title: name.to_string(),
                local: true,
                moderators: BTreeSet::from([owner.ap_id.clone()]),
                removed: false,
                deleted: false,
                published_at: Utc::now(),
            })
            .await?;
        tracing::info!(actor = %owner.ap_id, community = %community.ap_id, "Added community");
        Ok(community)
    }

    /// Follow a community, resolving it first if it is not known here.
    pub async fn follow(&self, person: &Person, community: &Url) -> AppResult<FollowResult> {
        let community = self.federation.resolver.resolve_community(community).await?;
        self.following.follow(person, &community.ap_id).await
    }

    /// Resolve a post by identifier or permalink, as a user search would.
    pub async fn resolve_post(&self, url: &Url) -> AppResult<Post> {
        self.federation.resolver.resolve_post(url).await
    }
}
