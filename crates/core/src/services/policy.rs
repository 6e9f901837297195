//! Policy filter.
//!
//! Every node gates creation and federation by its own site policy: blocked
//! instances, blocked URL patterns and whether NSFW content is allowed.
//! Readers go through a snapshot cached for a short TTL, so an admin change
//! may take up to one TTL to become visible everywhere.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fedsync_common::{AppError, AppResult, InstanceId, PolicyViolation};
use fedsync_db::entities::{LocalSite, Post};
use fedsync_db::repositories::LocalSiteRepository;
use tokio::sync::RwLock;
use url::Url;

/// Normalize a URL or URL pattern for prefix matching.
///
/// The scheme is dropped, the host lower-cased and a trailing `/` ignored, so
/// `https://Evil.com/` and `http://evil.com` normalize to `evil.com`.
#[must_use]
pub fn normalize_url_pattern(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);
    let (host, path) = without_scheme
        .split_once('/')
        .map_or((without_scheme, ""), |(host, path)| (host, path));
    let mut normalized = host.to_lowercase();
    if !path.is_empty() {
        normalized.push('/');
        normalized.push_str(path);
    }
    normalized.trim_end_matches('/').to_string()
}

/// Immutable view of the site policy.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    blocked_instances: BTreeSet<String>,
    blocked_urls: Vec<String>,
    disallow_nsfw_content: bool,
}

impl PolicySnapshot {
    fn from_site(site: &LocalSite) -> Self {
        Self {
            blocked_instances: site.blocked_instances.clone(),
            blocked_urls: site
                .blocked_urls
                .iter()
                .map(|u| normalize_url_pattern(u))
                .filter(|u| !u.is_empty())
                .collect(),
            disallow_nsfw_content: site.disallow_nsfw_content,
        }
    }

    /// Whether `instance` is blocked.
    #[must_use]
    pub fn is_blocked_instance(&self, instance: &InstanceId) -> bool {
        self.blocked_instances
            .iter()
            .any(|pattern| instance.matches_domain(pattern))
    }

    /// Whether `url` matches a blocked URL pattern.
    #[must_use]
    pub fn is_blocked_url(&self, url: &Url) -> bool {
        let candidate = normalize_url_pattern(url.as_str());
        self.blocked_urls
            .iter()
            .any(|pattern| candidate.starts_with(pattern.as_str()))
    }

    /// Whether NSFW content is accepted.
    #[must_use]
    pub const fn allows_nsfw(&self) -> bool {
        !self.disallow_nsfw_content
    }

    /// Whether a post may be shown on this node.
    ///
    /// Deleted, removed and NSFW-suppressed posts are not visible, and neither
    /// is anything originating on a blocked instance, even if it was mirrored
    /// before the block.
    #[must_use]
    pub fn is_visible(&self, post: &Post) -> bool {
        let blocked_origin = post
            .ap_id
            .instance()
            .is_ok_and(|origin| self.is_blocked_instance(&origin));
        !blocked_origin
            && !post.is_deleted()
            && !post.is_removed()
            && (self.allows_nsfw() || !post.nsfw)
    }
}

#[derive(Debug)]
struct Cached {
    fetched_at: Instant,
    snapshot: Arc<PolicySnapshot>,
}

/// Policy filter with a TTL-cached snapshot.
#[derive(Clone)]
pub struct PolicyFilter {
    site_repo: LocalSiteRepository,
    ttl: Duration,
    cache: Arc<RwLock<Option<Cached>>>,
}

impl PolicyFilter {
    /// Create a new policy filter.
    #[must_use]
    pub fn new(site_repo: LocalSiteRepository, ttl: Duration) -> Self {
        Self {
            site_repo,
            ttl,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Current snapshot, possibly up to one TTL stale.
    pub async fn snapshot(&self) -> AppResult<Arc<PolicySnapshot>> {
        if let Some(cached) = self.cache.read().await.as_ref()
            && cached.fetched_at.elapsed() < self.ttl
        {
            return Ok(Arc::clone(&cached.snapshot));
        }

        let site = self.site_repo.get().await?;
        let snapshot = Arc::new(PolicySnapshot::from_site(&site));
        *self.cache.write().await = Some(Cached {
            fetched_at: Instant::now(),
            snapshot: Arc::clone(&snapshot),
        });
        tracing::debug!("Refreshed policy snapshot");
        Ok(snapshot)
    }

    /// Drop the cached snapshot.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Check a post about to be created or edited locally.
    pub async fn check_local_post(&self, url: Option<&Url>, nsfw: bool) -> AppResult<()> {
        let snapshot = self.snapshot().await?;
        if let Some(url) = url
            && snapshot.is_blocked_url(url)
        {
            return Err(PolicyViolation::BlockedUrl.into());
        }
        if nsfw && !snapshot.allows_nsfw() {
            return Err(PolicyViolation::NsfwNotAllowed.into());
        }
        Ok(())
    }

    /// Whether `instance` is blocked.
    pub async fn is_blocked_instance(&self, instance: &InstanceId) -> AppResult<bool> {
        Ok(self.snapshot().await?.is_blocked_instance(instance))
    }

    /// Whether a post may be shown on this node.
    pub async fn is_visible(&self, post: &Post) -> AppResult<bool> {
        Ok(self.snapshot().await?.is_visible(post))
    }

    /// Current policy row, uncached.
    pub async fn site(&self) -> AppResult<LocalSite> {
        self.site_repo.get().await
    }

    /// This node's instance.
    pub async fn local_instance(&self) -> AppResult<InstanceId> {
        Ok(self.site_repo.get().await?.instance)
    }

    /// Block an instance by domain.
    pub async fn block_instance(&self, domain: &str) -> AppResult<LocalSite> {
        let domain = domain.trim().trim_end_matches('/').to_lowercase();
        if domain.is_empty() {
            return Err(AppError::BadRequest("empty instance domain".to_string()));
        }
        let site = self
            .site_repo
            .update(|site| {
                site.blocked_instances.insert(domain);
            })
            .await?;
        self.invalidate().await;
        Ok(site)
    }

    /// Unblock an instance by domain.
    pub async fn unblock_instance(&self, domain: &str) -> AppResult<LocalSite> {
        let domain = domain.trim().trim_end_matches('/').to_lowercase();
        let site = self
            .site_repo
            .update(|site| {
                site.blocked_instances.remove(&domain);
            })
            .await?;
        self.invalidate().await;
        Ok(site)
    }

    /// Replace the blocked URL patterns.
    pub async fn set_blocked_urls(&self, patterns: Vec<String>) -> AppResult<LocalSite> {
        let site = self
            .site_repo
            .update(|site| site.blocked_urls = patterns)
            .await?;
        self.invalidate().await;
        Ok(site)
    }

    /// Toggle whether NSFW content is rejected.
    pub async fn set_disallow_nsfw_content(&self, disallow: bool) -> AppResult<LocalSite> {
        let site = self
            .site_repo
            .update(|site| site.disallow_nsfw_content = disallow)
            .await?;
        self.invalidate().await;
        Ok(site)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedsync_db::test_utils::post_fixture;

    fn filter(ttl: Duration) -> PolicyFilter {
        let site = LocalSite {
            instance: InstanceId::from_url(&Url::parse("https://alpha.example/").unwrap())
                .unwrap(),
            blocked_instances: BTreeSet::new(),
            blocked_urls: Vec::new(),
            disallow_nsfw_content: false,
            updated_at: Utc::now(),
        };
        PolicyFilter::new(LocalSiteRepository::new(site), ttl)
    }

    #[test]
    fn test_normalize_url_pattern() {
        assert_eq!(normalize_url_pattern("https://Evil.com/"), "evil.com");
        assert_eq!(normalize_url_pattern("http://evil.com"), "evil.com");
        assert_eq!(normalize_url_pattern("evil.com/Page/"), "evil.com/Page");
    }

    #[tokio::test]
    async fn test_blocked_url_prefix() {
        let filter = filter(Duration::ZERO);
        filter
            .set_blocked_urls(vec!["https://evil.com/".to_string()])
            .await
            .unwrap();

        for url in ["https://evil.com", "https://evil.com/page", "http://EVIL.com/a/b"] {
            let err = filter
                .check_local_post(Some(&Url::parse(url).unwrap()), false)
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "blocked_url", "{url}");
        }
        filter
            .check_local_post(Some(&Url::parse("https://good.com/evil.com").unwrap()), false)
            .await
            .unwrap();

        filter.set_blocked_urls(Vec::new()).await.unwrap();
        filter
            .check_local_post(Some(&Url::parse("https://evil.com").unwrap()), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nsfw_toggle() {
        let filter = filter(Duration::ZERO);
        let mut post = post_fixture("https://beta.example/post/a", "beta", "main");
        post.nsfw = true;

        assert!(filter.is_visible(&post).await.unwrap());
        filter.set_disallow_nsfw_content(true).await.unwrap();
        assert!(!filter.is_visible(&post).await.unwrap());
        assert_eq!(
            filter.check_local_post(None, true).await.unwrap_err().error_code(),
            "nsfw_not_allowed"
        );

        filter.set_disallow_nsfw_content(false).await.unwrap();
        assert!(filter.is_visible(&post).await.unwrap());
        filter.check_local_post(None, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_blocked_origin_hides_held_post() {
        let filter = filter(Duration::ZERO);
        let post = post_fixture("https://gamma.example/post/a", "alpha", "main");
        assert!(filter.is_visible(&post).await.unwrap());

        filter.block_instance("gamma.example").await.unwrap();
        assert!(!filter.is_visible(&post).await.unwrap());

        filter.unblock_instance("gamma.example").await.unwrap();
        assert!(filter.is_visible(&post).await.unwrap());
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_within_ttl() {
        let site_filter = filter(Duration::from_secs(60));
        let before = site_filter.snapshot().await.unwrap();
        let again = site_filter.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&before, &again));

        site_filter.block_instance("beta.example").await.unwrap();
        let beta = InstanceId::from_url(&Url::parse("https://beta.example/u/bob").unwrap()).unwrap();
        assert!(site_filter.is_blocked_instance(&beta).await.unwrap());
        site_filter.unblock_instance("beta.example").await.unwrap();
        assert!(!site_filter.is_blocked_instance(&beta).await.unwrap());
    }
}
