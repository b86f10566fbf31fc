//! # Async Batch Payload Publisher
//!
//! Publishes to many recipients concurrently. Returns as soon as every
//! publish has succeeded or the first one has failed; publishes still in
//! flight after a failure run to completion detached.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use shared_types::{EncodedPayload, PublicKey, PublishError};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::adapters::latch::CancellableCountDownLatch;
use crate::ports::PayloadPublisher;

type PublishJob = Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send + 'static>>;

/// Bounded concurrent fan-out over a [`PayloadPublisher`].
///
/// Payloads are delivered exactly as given; stripping each one down to its
/// recipient's view happens before the fan-out.
pub struct AsyncBatchPayloadPublisher {
    payload_publisher: Arc<dyn PayloadPublisher>,
    permits: Arc<Semaphore>,
}

impl AsyncBatchPayloadPublisher {
    /// Create a publisher running at most `concurrency` publishes at once.
    pub fn new(payload_publisher: Arc<dyn PayloadPublisher>, concurrency: usize) -> Self {
        Self {
            payload_publisher,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Publish each payload to `recipient`.
    pub async fn publish_all(
        &self,
        payloads: Vec<EncodedPayload>,
        recipient: PublicKey,
    ) -> Result<(), PublishError> {
        self.publish_each(payloads.into_iter().map(|payload| (payload, recipient)))
            .await
    }

    /// Publish every `(payload, recipient)` delivery.
    pub async fn publish_each<I>(&self, deliveries: I) -> Result<(), PublishError>
    where
        I: IntoIterator<Item = (EncodedPayload, PublicKey)>,
    {
        let jobs: Vec<PublishJob> = deliveries
            .into_iter()
            .map(|(payload, recipient)| {
                let publisher = self.payload_publisher.clone();
                Box::pin(async move { publisher.publish_payload(&payload, &recipient).await })
                    as PublishJob
            })
            .collect();
        self.run(jobs).await
    }

    async fn run(&self, jobs: Vec<PublishJob>) -> Result<(), PublishError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let latch = Arc::new(CancellableCountDownLatch::new(jobs.len()));
        debug!("[pr-02] fanning out {} publishes", jobs.len());

        for job in jobs {
            let latch = latch.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    latch.cancel(PublishError::Cancelled);
                    return;
                };
                match job.await {
                    Ok(()) => latch.count_down(),
                    Err(err) => {
                        warn!("[pr-02] publish failed: {}", err);
                        latch.cancel(err);
                    }
                }
            });
        }

        latch.wait().await
    }
}
