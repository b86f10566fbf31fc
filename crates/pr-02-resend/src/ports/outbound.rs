//! # Outbound Ports
//!
//! Traits for reaching peers over the network.

use async_trait::async_trait;
use shared_types::{EncodedPayload, PublicKey, PublishError};

use crate::domain::{
    PushBatchRequest, ResendBatchRequest, ResendBatchResponse, ResendRequest, ResendResponse,
};

/// Peer-to-peer recovery calls - outbound port.
#[async_trait]
pub trait RecoveryClient: Send + Sync {
    /// Ask the peer at `url` to batch-resend everything for a key.
    async fn make_batch_resend_request(
        &self,
        url: &str,
        request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, PublishError>;

    /// Legacy resend call.
    async fn make_resend_request(
        &self,
        url: &str,
        request: ResendRequest,
    ) -> Result<ResendResponse, PublishError>;

    /// Push a batch of payloads to the peer at `url`.
    async fn push_batch(&self, url: &str, request: PushBatchRequest) -> Result<(), PublishError>;
}

/// Delivers accumulated payload batches - outbound port.
#[async_trait]
pub trait ResendBatchPublisher: Send + Sync {
    /// Push `payloads` to the node at `url`.
    async fn publish_batch(&self, url: &str, payloads: Vec<EncodedPayload>)
        -> Result<(), PublishError>;
}

/// Delivers one payload to the node hosting a recipient key - outbound port.
#[async_trait]
pub trait PayloadPublisher: Send + Sync {
    /// Publish `payload` to the node hosting `recipient`.
    async fn publish_payload(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<(), PublishError>;
}

/// Delivers privacy group definitions - outbound port.
#[async_trait]
pub trait PrivacyGroupPublisher: Send + Sync {
    /// Publish encoded privacy group `data` to the node hosting `recipient`.
    async fn publish_privacy_group(
        &self,
        data: &[u8],
        recipient: &PublicKey,
    ) -> Result<(), PublishError>;
}

#[cfg(any(test, feature = "test-utils"))]
mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    /// Mock batch publisher that records every batch.
    #[derive(Default)]
    pub struct MockResendBatchPublisher {
        /// Recorded (url, payload count) pairs.
        pub batches: Mutex<Vec<(String, usize)>>,
        /// Failure returned for every call, if set.
        pub fail_with: Mutex<Option<PublishError>>,
    }

    impl MockResendBatchPublisher {
        /// Create a succeeding mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock failing every call with `error`.
        pub fn failing(error: PublishError) -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                fail_with: Mutex::new(Some(error)),
            }
        }

        /// Number of batches published.
        pub fn batch_count(&self) -> usize {
            self.batches.lock().len()
        }
    }

    #[async_trait]
    impl ResendBatchPublisher for MockResendBatchPublisher {
        async fn publish_batch(
            &self,
            url: &str,
            payloads: Vec<EncodedPayload>,
        ) -> Result<(), PublishError> {
            self.batches.lock().push((url.to_string(), payloads.len()));
            match self.fail_with.lock().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    /// Mock payload publisher with per-recipient failures and delays.
    #[derive(Default)]
    pub struct MockPayloadPublisher {
        /// Recorded (recipient, payload) deliveries.
        pub published: Mutex<Vec<(PublicKey, EncodedPayload)>>,
        /// Recipients whose publish fails.
        pub failing: Mutex<HashSet<PublicKey>>,
        /// Artificial latency per recipient.
        pub delays: Mutex<HashMap<PublicKey, Duration>>,
    }

    impl MockPayloadPublisher {
        /// Create a succeeding mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every publish to `key`.
        pub fn fail_for(self, key: PublicKey) -> Self {
            self.failing.lock().insert(key);
            self
        }

        /// Delay every publish to `key`.
        pub fn delay_for(self, key: PublicKey, delay: Duration) -> Self {
            self.delays.lock().insert(key, delay);
            self
        }

        /// Number of successful deliveries.
        pub fn published_count(&self) -> usize {
            self.published.lock().len()
        }
    }

    #[async_trait]
    impl PayloadPublisher for MockPayloadPublisher {
        async fn publish_payload(
            &self,
            payload: &EncodedPayload,
            recipient: &PublicKey,
        ) -> Result<(), PublishError> {
            let delay = self.delays.lock().get(recipient).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().contains(recipient) {
                return Err(PublishError::NodeOffline {
                    url: format!("http://{}", recipient.to_hex()),
                });
            }
            self.published.lock().push((*recipient, payload.clone()));
            Ok(())
        }
    }

    /// Mock recovery client with per-url failures.
    #[derive(Default)]
    pub struct MockRecoveryClient {
        /// Urls that fail every call.
        pub failing_urls: Mutex<HashSet<String>>,
        /// Calls that fail before succeeding, per url.
        pub flaky_urls: Mutex<HashMap<String, usize>>,
        /// Recorded batch resend requests.
        pub batch_requests: Mutex<Vec<(String, ResendBatchRequest)>>,
        /// Recorded legacy resend requests.
        pub resend_requests: Mutex<Vec<(String, ResendRequest)>>,
        /// Recorded pushes.
        pub pushes: Mutex<Vec<(String, PushBatchRequest)>>,
    }

    impl MockRecoveryClient {
        /// Create a succeeding mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every call to `url`.
        pub fn fail_for(self, url: &str) -> Self {
            self.failing_urls.lock().insert(url.to_string());
            self
        }

        /// Fail the first `times` calls to `url`.
        pub fn flaky_for(self, url: &str, times: usize) -> Self {
            self.flaky_urls.lock().insert(url.to_string(), times);
            self
        }

        fn check(&self, url: &str) -> Result<(), PublishError> {
            if self.failing_urls.lock().contains(url) {
                return Err(PublishError::NodeOffline {
                    url: url.to_string(),
                });
            }
            let mut flaky = self.flaky_urls.lock();
            if let Some(remaining) = flaky.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PublishError::Rejected {
                        url: url.to_string(),
                        reason: "flaky".to_string(),
                    });
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecoveryClient for MockRecoveryClient {
        async fn make_batch_resend_request(
            &self,
            url: &str,
            request: ResendBatchRequest,
        ) -> Result<ResendBatchResponse, PublishError> {
            self.batch_requests.lock().push((url.to_string(), request));
            self.check(url)?;
            Ok(ResendBatchResponse { total: 0 })
        }

        async fn make_resend_request(
            &self,
            url: &str,
            request: ResendRequest,
        ) -> Result<ResendResponse, PublishError> {
            self.resend_requests.lock().push((url.to_string(), request));
            self.check(url)?;
            Ok(ResendResponse::default())
        }

        async fn push_batch(
            &self,
            url: &str,
            request: PushBatchRequest,
        ) -> Result<(), PublishError> {
            self.check(url)?;
            self.pushes.lock().push((url.to_string(), request));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mocks::{MockPayloadPublisher, MockRecoveryClient, MockResendBatchPublisher};
