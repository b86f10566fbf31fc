//! # Metered Publishers
//!
//! Decorators counting published and failed payloads in Prometheus.

use std::sync::Arc;

use async_trait::async_trait;
use pr_02_resend::{PayloadPublisher, ResendBatchPublisher};
use relay_telemetry::{metric_inc, RESEND_FAILED, RESEND_PUBLISHED, SUBSYSTEM_ERRORS};
use shared_types::{EncodedPayload, PublicKey, PublishError};

fn error_type(err: &PublishError) -> &'static str {
    match err {
        PublishError::NodeOffline { .. } => "node_offline",
        PublishError::Rejected { .. } => "rejected",
        PublishError::KeyNotFound(_) => "key_not_found",
        PublishError::Cancelled => "cancelled",
    }
}

fn record(result: &Result<(), PublishError>, payloads: usize) {
    match result {
        Ok(()) => RESEND_PUBLISHED.inc_by(payloads as f64),
        Err(err) => {
            RESEND_FAILED.inc_by(payloads as f64);
            metric_inc!(SUBSYSTEM_ERRORS, &["resend", error_type(err)]);
        }
    }
}

/// [`ResendBatchPublisher`] that records every batch outcome.
pub struct MeteredBatchPublisher {
    inner: Arc<dyn ResendBatchPublisher>,
}

impl MeteredBatchPublisher {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn ResendBatchPublisher>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ResendBatchPublisher for MeteredBatchPublisher {
    async fn publish_batch(
        &self,
        url: &str,
        payloads: Vec<EncodedPayload>,
    ) -> Result<(), PublishError> {
        let count = payloads.len();
        let result = self.inner.publish_batch(url, payloads).await;
        record(&result, count);
        result
    }
}

/// [`PayloadPublisher`] that records every delivery outcome.
pub struct MeteredPayloadPublisher {
    inner: Arc<dyn PayloadPublisher>,
}

impl MeteredPayloadPublisher {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn PayloadPublisher>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl PayloadPublisher for MeteredPayloadPublisher {
    async fn publish_payload(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<(), PublishError> {
        let result = self.inner.publish_payload(payload, recipient).await;
        record(&result, 1);
        result
    }
}
