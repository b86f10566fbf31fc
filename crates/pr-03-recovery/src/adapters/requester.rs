//! # Batch Transaction Requester
//!
//! [`BatchTransactionRequester`] over the peer recovery client, retrying
//! each key's request a bounded number of times.

use std::sync::Arc;

use async_trait::async_trait;
use pr_02_resend::{RecoveryClient, ResendBatchRequest, ResendRequest};
use shared_types::{Enclave, PublicKey};
use tracing::{debug, warn};

use crate::ports::BatchTransactionRequester;

/// Requests every local key's transactions from a peer.
pub struct BatchTransactionRequesterImpl {
    enclave: Arc<dyn Enclave>,
    client: Arc<dyn RecoveryClient>,
    batch_size: usize,
    max_attempts: u32,
}

impl BatchTransactionRequesterImpl {
    /// Create a requester asking for `batch_size` payloads per push and
    /// trying each request up to `max_attempts` times.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        client: Arc<dyn RecoveryClient>,
        batch_size: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            enclave,
            client,
            batch_size,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn local_keys(&self, url: &str) -> Option<Vec<PublicKey>> {
        match self.enclave.public_keys().await {
            Ok(keys) => Some(keys),
            Err(err) => {
                warn!("[pr-03] cannot list local keys for request to {}: {}", url, err);
                None
            }
        }
    }

    async fn request_batch(&self, url: &str, key: PublicKey) -> bool {
        for attempt in 1..=self.max_attempts {
            let request = ResendBatchRequest::new(key, Some(self.batch_size));
            match self.client.make_batch_resend_request(url, request).await {
                Ok(response) => {
                    debug!("[pr-03] {} will push {} transactions for {}", url, response.total, key);
                    return true;
                }
                Err(err) => warn!(
                    "[pr-03] batch resend request to {} for {} failed (attempt {}/{}): {}",
                    url, key, attempt, self.max_attempts, err
                ),
            }
        }
        false
    }

    async fn request_legacy(&self, url: &str, key: PublicKey) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.client.make_resend_request(url, ResendRequest::all(key)).await {
                Ok(_) => return true,
                Err(err) => warn!(
                    "[pr-03] legacy resend request to {} for {} failed (attempt {}/{}): {}",
                    url, key, attempt, self.max_attempts, err
                ),
            }
        }
        false
    }
}

#[async_trait]
impl BatchTransactionRequester for BatchTransactionRequesterImpl {
    async fn request_all_transactions_from_node(&self, url: &str) -> bool {
        let Some(keys) = self.local_keys(url).await else {
            return false;
        };
        let mut all_succeeded = true;
        for key in keys {
            all_succeeded &= self.request_batch(url, key).await;
        }
        all_succeeded
    }

    async fn request_all_transactions_from_legacy_node(&self, url: &str) -> bool {
        let Some(keys) = self.local_keys(url).await else {
            return false;
        };
        let mut all_succeeded = true;
        for key in keys {
            all_succeeded &= self.request_legacy(url, key).await;
        }
        all_succeeded
    }
}
