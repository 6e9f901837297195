//! Delivery transports.

use std::time::Duration;

use async_trait::async_trait;
use fedsync_common::{AppError, AppResult};
use fedsync_federation::{ACTIVITY_JSON, ACTOR_HEADER};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::jobs::DeliverJob;

/// Moves one job to its recipient.
///
/// `AppError::Unreachable` is retried; any other error is final.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Deliver `job` once.
    async fn deliver(&self, job: &DeliverJob) -> AppResult<()>;
}

/// POSTs activities to `{instance}/inbox`.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fedsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
    async fn deliver(&self, job: &DeliverJob) -> AppResult<()> {
        let inbox = job.recipient.inbox_url()?;
        let actor = job
            .actor()
            .ok_or_else(|| AppError::BadRequest("activity without actor".to_string()))?;

        let response = self
            .client
            .post(inbox.clone())
            .header(CONTENT_TYPE, ACTIVITY_JSON)
            .header(ACCEPT, ACTIVITY_JSON)
            .header(ACTOR_HEADER, actor.as_str())
            .json(&job.activity)
            .send()
            .await
            .map_err(|e| AppError::Unreachable(format!("{inbox}: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(AppError::BadRequest(format!("{inbox}: status {status}")))
        } else {
            Err(AppError::Unreachable(format!("{inbox}: status {status}")))
        }
    }
}
