//! Fetching objects from other nodes.

use std::time::Duration;

use async_trait::async_trait;
use fedsync_common::{AppError, AppResult, InstanceId};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, LOCATION};
use serde_json::Value;
use url::Url;

/// Header carrying the requesting instance's base URL, so the serving node
/// can apply its own blocklist.
pub const REQUESTER_HEADER: &str = "x-fedsync-requester";

/// Media type of federated objects.
pub const ACTIVITY_JSON: &str = "application/activity+json";

/// What a node answered for an object URL.
#[derive(Clone, Debug)]
pub enum FetchResponse {
    /// The object itself.
    Object(Value),
    /// The object lives elsewhere; follow to its canonical identifier.
    Redirect(Url),
    /// Unknown, blocked, deleted or otherwise not served.
    NotFound,
}

/// Fetches objects from their serving node.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch `url` on behalf of `requester`.
    async fn fetch(&self, url: &Url, requester: &InstanceId) -> AppResult<FetchResponse>;
}

/// HTTP fetcher. Redirects are surfaced, not followed.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("fedsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ObjectFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, requester: &InstanceId) -> AppResult<FetchResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACTIVITY_JSON)
            .header(REQUESTER_HEADER, requester.base_url()?.as_str())
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("{url}: {e}")))?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AppError::Unreachable(format!("{url}: redirect without location")))?;
            return Ok(FetchResponse::Redirect(url.join(location)?));
        }
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(FetchResponse::NotFound);
        }
        if !status.is_success() {
            return Err(AppError::Unreachable(format!("{url}: status {status}")));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Serialization(format!("{url}: {e}")))?;
        Ok(FetchResponse::Object(body))
    }
}
