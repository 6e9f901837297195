//! In-memory delivery queue.
//!
//! Jobs are pushed to apalis in-memory storage and processed by the
//! `deliver` worker. Enqueueing never waits on the network.

use std::sync::atomic::{AtomicUsize, Ordering};

use apalis::prelude::*;
use apalis_core::memory::MemoryStorage;
use apalis_core::mq::MessageQueue;
use async_trait::async_trait;
use fedsync_common::{AppError, AppResult, InstanceId};
use fedsync_federation::DeliveryQueue;
use serde_json::Value;
use tokio::sync::Notify;

use crate::jobs::DeliverJob;
use crate::retry::DeadLetterEntry;
use crate::workers::{DeliverContext, deliver_worker};

/// Count of enqueued jobs the worker has not finished.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn start(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Delivery queue backed by apalis in-memory storage.
#[derive(Clone)]
pub struct TaskDeliveryQueue {
    storage: MemoryStorage<DeliverJob>,
    ctx: DeliverContext,
}

impl TaskDeliveryQueue {
    /// Create the queue and spawn its worker, running at most `concurrency`
    /// deliveries at once.
    #[must_use]
    pub fn spawn(ctx: DeliverContext, concurrency: usize) -> Self {
        let storage = MemoryStorage::new();

        let worker_ctx = ctx.clone();
        let backend = storage.clone();
        tokio::spawn(async move {
            let monitor = Monitor::new().register({
                WorkerBuilder::new("deliver")
                    .enable_tracing()
                    .concurrency(concurrency.max(1))
                    .data(worker_ctx)
                    .backend(backend)
                    .build_fn(deliver_worker)
            });

            if let Err(e) = monitor.run().await {
                tracing::error!(error = %e, "Delivery worker failed");
            }
        });

        Self { storage, ctx }
    }

    /// Deliveries not yet finished, retries included.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.ctx.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until every enqueued delivery has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.ctx.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Jobs that exhausted their retries, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetterEntry<DeliverJob>> {
        self.ctx.dead_letters.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl DeliveryQueue for TaskDeliveryQueue {
    async fn enqueue(&self, recipient: InstanceId, activity: Value) -> AppResult<()> {
        let job = DeliverJob::new(recipient, activity);
        let instance = job.recipient.clone();
        tracing::debug!(%instance, activity_id = job.activity_id(), "Queued delivery job");
        self.ctx.in_flight.start();
        if let Err(e) = self.storage.clone().enqueue(job).await {
            self.ctx.in_flight.finish();
            return Err(AppError::Internal(format!("Failed to queue job: {e:?}")));
        }
        Ok(())
    }
}
