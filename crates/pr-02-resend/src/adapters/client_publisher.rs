//! # Client Resend Batch Publisher
//!
//! [`ResendBatchPublisher`] that pushes through a [`RecoveryClient`].

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{EncodedPayload, PublishError};
use tracing::{debug, warn};

use crate::domain::PushBatchRequest;
use crate::ports::{RecoveryClient, ResendBatchPublisher};

/// Pushes payload batches with the recovery client.
pub struct ClientResendBatchPublisher {
    client: Arc<dyn RecoveryClient>,
}

impl ClientResendBatchPublisher {
    /// Create a publisher over `client`.
    pub fn new(client: Arc<dyn RecoveryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResendBatchPublisher for ClientResendBatchPublisher {
    async fn publish_batch(
        &self,
        url: &str,
        payloads: Vec<EncodedPayload>,
    ) -> Result<(), PublishError> {
        let count = payloads.len();
        debug!("[pr-02] pushing batch of {} payloads to {}", count, url);

        self.client
            .push_batch(url, PushBatchRequest { payloads })
            .await
            .inspect_err(|err| {
                warn!("[pr-02] push of {} payloads to {} failed: {}", count, url, err)
            })
    }
}
