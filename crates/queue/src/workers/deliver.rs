//! Deliver worker.

use std::collections::VecDeque;
use std::sync::Arc;

use apalis::prelude::*;
use fedsync_common::AppError;
use fedsync_common::config::DeliveryConfig;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::delivery_impl::InFlight;
use crate::jobs::DeliverJob;
use crate::retry::{DeadLetterEntry, RetryConfig};
use crate::transport::DeliveryTransport;

/// Context for the deliver worker.
#[derive(Clone)]
pub struct DeliverContext {
    /// Moves jobs to recipients.
    pub transport: Arc<dyn DeliveryTransport>,
    /// Backoff between attempts.
    pub retry: RetryConfig,
    /// Jobs that exhausted their retries, oldest first.
    pub dead_letters: Arc<Mutex<VecDeque<DeadLetterEntry<DeliverJob>>>>,
    /// Dead letters kept before the oldest is dropped.
    pub dead_letter_capacity: usize,
    pub(crate) in_flight: Arc<InFlight>,
}

impl DeliverContext {
    /// Create a new deliver context.
    #[must_use]
    pub fn new(transport: Arc<dyn DeliveryTransport>, retry: RetryConfig) -> Self {
        Self {
            transport,
            retry,
            dead_letters: Arc::new(Mutex::new(VecDeque::new())),
            dead_letter_capacity: DeliveryConfig::default().dead_letter_capacity,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Keep at most `capacity` dead letters.
    #[must_use]
    pub fn with_dead_letter_capacity(mut self, capacity: usize) -> Self {
        self.dead_letter_capacity = capacity;
        self
    }

    async fn dead_letter(&self, entry: DeadLetterEntry<DeliverJob>) {
        let mut dead_letters = self.dead_letters.lock().await;
        while dead_letters.len() >= self.dead_letter_capacity.max(1) {
            if let Some(dropped) = dead_letters.pop_front() {
                warn!(
                    instance = %dropped.job.recipient,
                    activity_id = dropped.job.activity_id(),
                    "Dead letter evicted"
                );
            }
        }
        dead_letters.push_back(entry);
    }
}

/// Worker function for delivering activities.
///
/// Retries with backoff until the job is delivered, fails for good or runs
/// out of retries. A job that never made it is dead-lettered and aborted.
///
/// # Errors
/// Returns `Error::Abort` once the job is dead-lettered.
pub async fn deliver_worker(job: DeliverJob, ctx: Data<DeliverContext>) -> Result<(), Error> {
    let result = deliver_with_retry(job, &ctx).await;
    ctx.in_flight.finish();
    result
}

async fn deliver_with_retry(mut job: DeliverJob, ctx: &DeliverContext) -> Result<(), Error> {
    loop {
        debug!(
            instance = %job.recipient,
            activity_id = job.activity_id(),
            attempt = job.attempts,
            "Delivering activity"
        );

        let error = match ctx.transport.deliver(&job).await {
            Ok(()) => {
                info!(
                    instance = %job.recipient,
                    activity_id = job.activity_id(),
                    "Activity delivered"
                );
                return Ok(());
            }
            Err(e) => e,
        };

        let retryable = matches!(error, AppError::Unreachable(_));
        if retryable && ctx.retry.should_retry(job.attempts) {
            let delay = ctx.retry.delay_for_attempt(job.attempts);
            warn!(
                instance = %job.recipient,
                activity_id = job.activity_id(),
                attempt = job.attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Delivery failed, retrying"
            );
            job.attempts += 1;
            tokio::time::sleep(delay).await;
            continue;
        }

        let attempts = job.attempts + 1;
        error!(
            instance = %job.recipient,
            activity_id = job.activity_id(),
            attempts,
            error = %error,
            "Delivery dead-lettered"
        );
        let message = error.to_string();
        ctx.dead_letter(DeadLetterEntry::new(job, attempts, message)).await;
        let error: Box<dyn std::error::Error + Send + Sync> = Box::new(error);
        return Err(Error::Abort(Arc::new(error)));
    }
}
