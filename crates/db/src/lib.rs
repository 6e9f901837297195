//! Persistence layer for fedsync.
//!
//! Entities are plain serde structs. Repositories expose lookups by local key
//! and by federated identifier plus filtered listing, backed by in-memory
//! tables.

pub mod entities;
pub mod repositories;
pub mod test_utils;

use std::collections::BTreeSet;

use chrono::Utc;
use fedsync_common::config::PolicyConfig;
use fedsync_common::InstanceId;

use entities::LocalSite;
use repositories::{
    BanRepository, CommunityRepository, FollowRepository, LocalSiteRepository, PersonRepository,
    PostRepository, ReportRepository, VoteRepository,
};

/// All repositories of one node.
#[derive(Clone)]
#[allow(missing_docs)]
pub struct Store {
    pub posts: PostRepository,
    pub communities: CommunityRepository,
    pub persons: PersonRepository,
    pub reports: ReportRepository,
    pub follows: FollowRepository,
    pub votes: VoteRepository,
    pub bans: BanRepository,
    pub local_site: LocalSiteRepository,
}

impl Store {
    /// Create an empty store for `instance`, seeding the site policy from config.
    #[must_use]
    pub fn new(instance: InstanceId, policy: &PolicyConfig) -> Self {
        let site = LocalSite {
            instance,
            blocked_instances: policy
                .blocked_instances
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect::<BTreeSet<_>>(),
            blocked_urls: policy.blocked_urls.clone(),
            disallow_nsfw_content: policy.disallow_nsfw_content,
            updated_at: Utc::now(),
        };

        Self {
            posts: PostRepository::new(),
            communities: CommunityRepository::new(),
            persons: PersonRepository::new(),
            reports: ReportRepository::new(),
            follows: FollowRepository::new(),
            votes: VoteRepository::new(),
            bans: BanRepository::new(),
            local_site: LocalSiteRepository::new(site),
        }
    }
}
