//! In-process network of nodes for integration tests.
//!
//! Deliveries and fetches go through the real JSON codecs but never leave the
//! process. Every delivery is tracked so tests can wait for the network to
//! go quiet before asserting.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use fedsync_common::{AppError, AppResult, Config, InstanceId, ObjectId};
use fedsync_core::CreatePostInput;
use fedsync_db::entities::{Community, Person, Post};
use fedsync_federation::{
    DeliveryQueue, FetchResponse, InboxActivity, InboxOutcome, ObjectFetcher, activity_type,
};
use fedsync_server::Node;
use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use url::Url;

/// One delivered activity and what the receiver made of it.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub to: InstanceId,
    pub kind: String,
    pub outcome: Option<InboxOutcome>,
}

#[derive(Default)]
struct Inner {
    nodes: RwLock<HashMap<InstanceId, Node>>,
    offline: RwLock<HashSet<InstanceId>>,
    deliveries: RwLock<Vec<Delivery>>,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Inner {
    fn finish(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn node(&self, instance: &InstanceId) -> Option<Node> {
        if self.offline.read().await.contains(instance) {
            return None;
        }
        self.nodes.read().await.get(instance).cloned()
    }

    async fn deliver(&self, to: InstanceId, body: String) {
        let value: Value = serde_json::from_str(&body).unwrap();
        let kind = activity_type(&value);
        let outcome = match self.node(&to).await {
            Some(node) => {
                let actor = Url::parse(value["actor"].as_str().unwrap()).unwrap();
                let activity: InboxActivity = serde_json::from_value(value).unwrap();
                Some(node.inbox.receive(&actor, activity).await)
            }
            None => None,
        };
        self.deliveries.write().await.push(Delivery { to, kind, outcome });
    }
}

/// A set of nodes that reach each other through loopback.
#[derive(Clone, Default)]
pub struct Network {
    inner: Arc<Inner>,
}

struct LoopbackQueue {
    net: Weak<Inner>,
}

#[async_trait]
impl DeliveryQueue for LoopbackQueue {
    async fn enqueue(&self, recipient: InstanceId, activity: Value) -> AppResult<()> {
        let Some(net) = self.net.upgrade() else {
            return Ok(());
        };
        let body = serde_json::to_string(&activity)?;
        net.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            net.deliver(recipient, body).await;
            net.finish();
        });
        Ok(())
    }
}

struct LoopbackFetcher {
    net: Weak<Inner>,
}

#[async_trait]
impl ObjectFetcher for LoopbackFetcher {
    async fn fetch(&self, url: &Url, requester: &InstanceId) -> AppResult<FetchResponse> {
        let net = self
            .net
            .upgrade()
            .ok_or_else(|| AppError::Unreachable("network gone".to_string()))?;
        net.fetches.fetch_add(1, Ordering::SeqCst);
        let origin = InstanceId::from_url(url)?;
        let node = net
            .node(&origin)
            .await
            .ok_or_else(|| AppError::Unreachable(format!("{origin} is offline")))?;
        match node.objects.serve(url, Some(requester)).await? {
            FetchResponse::Object(object) => {
                let body = serde_json::to_string(&object)?;
                Ok(FetchResponse::Object(serde_json::from_str(&body)?))
            }
            other => Ok(other),
        }
    }
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a node at `https://{label}.example/`.
    pub async fn node(&self, label: &str) -> Node {
        self.node_with(label, |_| {}).await
    }

    /// Start a node with adjusted configuration.
    pub async fn node_with(&self, label: &str, adjust: impl FnOnce(&mut Config)) -> Node {
        let mut config = Config::for_url(&format!("https://{label}.example/"));
        config.policy.cache_ttl_ms = 0;
        config.federation.resolve_timeout_ms = 2_000;
        adjust(&mut config);

        let net = Arc::downgrade(&self.inner);
        let node = Node::new(
            &config,
            Arc::new(LoopbackQueue { net: net.clone() }),
            Arc::new(LoopbackFetcher { net }),
        )
        .unwrap();
        self.inner
            .nodes
            .write()
            .await
            .insert(node.instance.clone(), node.clone());
        node
    }

    /// Take a node off the network; deliveries to it are lost.
    pub async fn set_offline(&self, node: &Node, offline: bool) {
        let mut set = self.inner.offline.write().await;
        if offline {
            set.insert(node.instance.clone());
        } else {
            set.remove(&node.instance);
        }
    }

    /// Wait until every delivery, including those it triggered, is processed.
    pub async fn settle(&self) {
        let wait = async {
            loop {
                let notified = self.inner.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .expect("network did not settle");
    }

    /// Deliveries processed so far.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.inner.deliveries.read().await.clone()
    }

    /// Deliveries of `kind` to `node`.
    pub async fn deliveries_to(&self, node: &Node, kind: &str) -> Vec<Delivery> {
        self.deliveries()
            .await
            .into_iter()
            .filter(|d| d.to == node.instance && d.kind == kind)
            .collect()
    }

    /// Fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    /// Forget recorded deliveries.
    pub async fn clear_deliveries(&self) {
        self.inner.deliveries.write().await.clear();
    }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Three nodes: `alpha` hosts community `main`, `beta` and `gamma` follow it.
pub struct Cluster {
    pub net: Network,
    pub alpha: Node,
    pub beta: Node,
    pub gamma: Node,
    pub community: Community,
    /// Moderator of `main`, on alpha.
    pub alpha_mod: Person,
    /// Admin of alpha.
    pub alpha_admin: Person,
    pub alice: Person,
    pub bob: Person,
    pub beta_admin: Person,
    pub carol: Person,
}

impl Cluster {
    pub async fn new() -> Self {
        let net = Network::new();
        let alpha = net.node("alpha").await;
        let beta = net.node("beta").await;
        let gamma = net.node("gamma").await;

        let alpha_mod = alpha.add_person("mod", false).await.unwrap();
        let alpha_admin = alpha.add_person("admin", true).await.unwrap();
        let alice = alpha.add_person("alice", false).await.unwrap();
        let bob = beta.add_person("bob", false).await.unwrap();
        let beta_admin = beta.add_person("admin", true).await.unwrap();
        let carol = gamma.add_person("carol", false).await.unwrap();
        let community = alpha.add_community(&alpha_mod, "main").await.unwrap();

        beta.follow(&bob, community.ap_id.inner()).await.unwrap();
        gamma.follow(&carol, community.ap_id.inner()).await.unwrap();
        net.settle().await;

        Self {
            net,
            alpha,
            beta,
            gamma,
            community,
            alpha_mod,
            alpha_admin,
            alice,
            bob,
            beta_admin,
            carol,
        }
    }

    /// Create a post in `main` as `author` on `node` and let it spread.
    pub async fn post(&self, node: &Node, author: &Person, name: &str) -> Post {
        let post = node
            .posts
            .create(author, post_input(&self.community.ap_id, name))
            .await
            .unwrap();
        self.net.settle().await;
        post
    }
}

pub fn post_input(community: &ObjectId, name: &str) -> CreatePostInput {
    CreatePostInput {
        community_id: community.clone(),
        name: name.to_string(),
        body: None,
        url: None,
        nsfw: false,
        embed: Default::default(),
    }
}

/// A node's copy of `post`, if it holds one.
pub async fn copy_of(node: &Node, post: &Post) -> Option<Post> {
    node.store.posts.find_by_ap_id(&post.ap_id).await.unwrap()
}
