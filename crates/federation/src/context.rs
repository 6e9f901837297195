//! Shared state for inbound processing.

use std::sync::Arc;
use std::time::Duration;

use fedsync_common::{AppResult, InstanceId};
use fedsync_core::{
    AnnouncerService, FollowingService, ModerationService, PolicyFilter, PostService,
    ReportService,
};
use fedsync_db::Store;
use url::Url;

use crate::announcer::OutboundAnnouncer;
use crate::fetch::ObjectFetcher;
use crate::locks::ObjectLocks;
use crate::resolver::Resolver;

/// Everything a node needs to apply federated activities.
#[derive(Clone)]
#[allow(missing_docs)]
pub struct FederationContext {
    pub store: Store,
    pub policy: PolicyFilter,
    pub posts: PostService,
    pub moderation: ModerationService,
    pub reports: ReportService,
    pub following: FollowingService,
    pub resolver: Resolver,
    pub outbound: OutboundAnnouncer,
    pub locks: ObjectLocks,
    pub base_url: Url,
    pub instance: InstanceId,
}

/// Timeouts of the resolver.
#[derive(Debug, Clone, Copy)]
pub struct ResolveTimeouts {
    /// Upper bound for a whole resolution.
    pub resolve: Duration,
    /// Upper bound for one fetch.
    pub fetch: Duration,
}

impl FederationContext {
    /// Wire up the services of a node around `store`.
    pub fn new(
        store: Store,
        policy: PolicyFilter,
        outbound: OutboundAnnouncer,
        fetcher: Arc<dyn ObjectFetcher>,
        base_url: Url,
        timeouts: ResolveTimeouts,
    ) -> AppResult<Self> {
        let instance = InstanceId::from_url(&base_url)?;
        let announcer: AnnouncerService = Arc::new(outbound.clone());
        let posts = PostService::new(
            store.clone(),
            policy.clone(),
            announcer.clone(),
            base_url.clone(),
        );
        let resolver = Resolver::new(
            store.clone(),
            policy.clone(),
            posts.clone(),
            fetcher,
            base_url.clone(),
            timeouts.resolve,
            timeouts.fetch,
        )?;
        Ok(Self {
            moderation: ModerationService::new(store.clone(), policy.clone(), announcer.clone()),
            reports: ReportService::new(store.clone(), announcer.clone(), base_url.clone()),
            following: FollowingService::new(store.clone(), announcer),
            posts,
            resolver,
            outbound,
            locks: ObjectLocks::new(),
            store,
            policy,
            base_url,
            instance,
        })
    }
}
