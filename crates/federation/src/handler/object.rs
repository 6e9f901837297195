//! Serving objects to other nodes.
//!
//! Unknown, blocked, deleted and removed all answer the same `NotFound`, so a
//! requester learns nothing about why it cannot see an object.

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use fedsync_common::{AppError, AppResult, InstanceId, ObjectId};
use fedsync_core::PolicyFilter;
use fedsync_db::Store;
use fedsync_db::entities::{Community, PostFilter};
use serde_json::Value;
use url::Url;

use super::FederationState;
use crate::activities::CollectionTarget;
use crate::convert::{CommunityToApGroup, PersonToApPerson, PostToApPage, parse_permalink};
use crate::fetch::{ACTIVITY_JSON, FetchResponse, REQUESTER_HEADER};
use crate::objects::ApFeaturedCollection;

/// Answers object fetches for one node.
#[derive(Clone)]
pub struct ObjectServer {
    store: Store,
    policy: PolicyFilter,
    base_url: Url,
}

impl ObjectServer {
    /// Create a new object server.
    #[must_use]
    pub const fn new(store: Store, policy: PolicyFilter, base_url: Url) -> Self {
        Self {
            store,
            policy,
            base_url,
        }
    }

    /// What this node answers for `url` when asked by `requester`.
    pub async fn serve(&self, url: &Url, requester: Option<&InstanceId>) -> AppResult<FetchResponse> {
        if let Some(requester) = requester
            && self.policy.is_blocked_instance(requester).await?
        {
            tracing::debug!(instance = %requester, object = %url, "Refusing fetch from blocked instance");
            return Ok(FetchResponse::NotFound);
        }

        let ap_id = ObjectId::new(url.clone());
        let by_permalink = match parse_permalink(&self.base_url, url) {
            Some(key) => self.store.posts.find_by_id(key).await?,
            None => None,
        };
        let post = match by_permalink {
            Some(post) => Some(post),
            None => self.store.posts.find_by_ap_id(&ap_id).await?,
        };
        if let Some(post) = post {
            if !self.policy.is_visible(&post).await? {
                return Ok(FetchResponse::NotFound);
            }
            if !post.local {
                return Ok(FetchResponse::Redirect(post.ap_id.inner().clone()));
            }
            return Ok(FetchResponse::Object(to_value(&post.to_ap_page())?));
        }

        if let Some(community) = self.store.communities.find_by_ap_id(&ap_id).await?
            && community.local
            && community.is_open()
        {
            return Ok(FetchResponse::Object(to_value(&community.to_ap_group()?)?));
        }
        if let Some(person) = self.store.persons.find_by_ap_id(&ap_id).await?
            && person.local
        {
            return Ok(FetchResponse::Object(to_value(&person.to_ap_person()?)?));
        }
        if let Some(CollectionTarget::Featured(community)) = CollectionTarget::parse(url)
            && let Some(community) = self
                .store
                .communities
                .find_by_ap_id(&ObjectId::new(community))
                .await?
            && community.local
            && community.is_open()
        {
            return Ok(FetchResponse::Object(to_value(&self.featured(&community, url).await?)?));
        }
        Ok(FetchResponse::NotFound)
    }

    /// Visible featured posts of a local community, newest first.
    async fn featured(&self, community: &Community, id: &Url) -> AppResult<ApFeaturedCollection> {
        let snapshot = self.policy.snapshot().await?;
        let mut posts: Vec<_> = self
            .store
            .posts
            .list(&PostFilter {
                community_id: Some(community.ap_id.clone()),
                ..PostFilter::default()
            })
            .await?
            .into_iter()
            .filter(|p| p.is_featured() && snapshot.is_visible(p))
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let pages = posts.iter().map(PostToApPage::to_ap_page).collect();
        Ok(ApFeaturedCollection::new(id.clone(), pages))
    }
}

fn to_value<T: serde::Serialize>(object: &T) -> AppResult<Value> {
    Ok(serde_json::to_value(object)?)
}

/// Handle GET for any object URL served by this node.
pub async fn object_handler(
    State(state): State<FederationState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let path = uri.path_and_query().map_or("/", |p| p.as_str());
    let url = match state.objects.base_url.join(path.trim_start_matches('/')) {
        Ok(url) => url,
        Err(e) => return AppError::from(e).into_response(),
    };
    let requester = headers
        .get(REQUESTER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .and_then(|v| InstanceId::from_url(&v).ok());

    match state.objects.serve(&url, requester.as_ref()).await {
        Ok(FetchResponse::Object(object)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, ACTIVITY_JSON)],
            Json(object),
        )
            .into_response(),
        Ok(FetchResponse::Redirect(location)) => (
            StatusCode::FOUND,
            [(header::LOCATION, location.to_string())],
        )
            .into_response(),
        Ok(FetchResponse::NotFound) => AppError::opaque_not_found().into_response(),
        Err(e) => e.into_response(),
    }
}
