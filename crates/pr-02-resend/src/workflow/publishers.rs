//! # Workflow Publishers
//!
//! Terminal workflow steps that hand prepared payloads to the network.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Discovery, EncodedPayload, PublishError};
use tracing::{debug, warn};

use crate::adapters::AsyncBatchPayloadPublisher;
use crate::domain::{BatchWorkflowContext, ResendError};
use crate::ports::ResendBatchPublisher;
use crate::workflow::BatchWorkflowAction;

fn forget_offline_peer(discovery: &dyn Discovery, err: &PublishError) {
    if let PublishError::NodeOffline { url } = err {
        warn!("[pr-02] {} is offline, removing from party info", url);
        discovery.remove_peer(url);
    }
}

/// Accumulates prepared payloads and pushes them in batches.
///
/// A batch is flushed when it holds `batch_size` transactions or when every
/// transaction still expected in the run has been accumulated.
pub struct EncodedPayloadPublisher {
    publisher: Arc<dyn ResendBatchPublisher>,
    discovery: Arc<dyn Discovery>,
    outstanding: Vec<EncodedPayload>,
    outstanding_count: u64,
    published: u64,
    failed: u64,
    url: Option<String>,
}

impl EncodedPayloadPublisher {
    /// Create the step.
    pub fn new(publisher: Arc<dyn ResendBatchPublisher>, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            publisher,
            discovery,
            outstanding: Vec::new(),
            outstanding_count: 0,
            published: 0,
            failed: 0,
            url: None,
        }
    }

    fn processed(&self) -> u64 {
        self.published + self.failed
    }

    fn complete(&self, expected_total: u64) -> bool {
        self.outstanding_count > 0 && self.processed() + self.outstanding_count >= expected_total
    }

    async fn publish_outstanding(&mut self) {
        let count = std::mem::take(&mut self.outstanding_count);
        let payloads = std::mem::take(&mut self.outstanding);
        if count == 0 {
            return;
        }
        let Some(url) = self.url.clone() else {
            self.failed += count;
            return;
        };

        match self.publisher.publish_batch(&url, payloads).await {
            Ok(()) => {
                debug!("[pr-02] published {} transactions to {}", count, url);
                self.published += count;
            }
            Err(err) => {
                warn!("[pr-02] batch of {} transactions to {} failed: {}", count, url, err);
                forget_offline_peer(self.discovery.as_ref(), &err);
                self.failed += count;
            }
        }
    }
}

#[async_trait]
impl BatchWorkflowAction for EncodedPayloadPublisher {
    fn name(&self) -> &'static str {
        "EncodedPayloadPublisher"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let Some(recipient) = context.recipient.as_ref() else {
            return Ok(false);
        };
        self.url = Some(recipient.url.clone());

        self.outstanding
            .extend(std::mem::take(&mut context.payloads_to_publish));
        self.outstanding_count += 1;

        let batch_full = self.outstanding_count >= context.batch_size as u64;
        if batch_full || self.complete(context.expected_total) {
            self.publish_outstanding().await;
        }
        Ok(true)
    }

    async fn check_outstanding(&mut self, context: &BatchWorkflowContext) {
        if self.complete(context.expected_total) {
            self.publish_outstanding().await;
        }
    }

    async fn flush(&mut self) {
        self.publish_outstanding().await;
    }

    fn published_count(&self) -> u64 {
        self.published
    }

    fn failed_count(&self) -> u64 {
        self.failed
    }
}

/// Publishes each prepared payload individually to the requesting key.
pub struct StandardPayloadPublisher {
    publisher: Arc<AsyncBatchPayloadPublisher>,
    discovery: Arc<dyn Discovery>,
    published: u64,
    failed: u64,
}

impl StandardPayloadPublisher {
    /// Create the step.
    pub fn new(publisher: Arc<AsyncBatchPayloadPublisher>, discovery: Arc<dyn Discovery>) -> Self {
        Self {
            publisher,
            discovery,
            published: 0,
            failed: 0,
        }
    }
}

#[async_trait]
impl BatchWorkflowAction for StandardPayloadPublisher {
    fn name(&self) -> &'static str {
        "StandardPayloadPublisher"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let payloads = std::mem::take(&mut context.payloads_to_publish);
        match self.publisher.publish_all(payloads, context.recipient_key).await {
            Ok(()) => self.published += 1,
            Err(err) => {
                warn!(
                    "[pr-02] resend of {} to {} failed: {}",
                    context.encrypted_transaction.hash, context.recipient_key, err
                );
                forget_offline_peer(self.discovery.as_ref(), &err);
                self.failed += 1;
            }
        }
        Ok(true)
    }

    fn published_count(&self) -> u64 {
        self.published
    }

    fn failed_count(&self) -> u64 {
        self.failed
    }
}
