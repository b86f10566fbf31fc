//! # Outbound Ports

use async_trait::async_trait;
use shared_types::{EncodedPayload, MessageHash};

use crate::domain::StorePayloadError;

/// Asks one peer to push everything for this node's keys - outbound port.
#[async_trait]
pub trait BatchTransactionRequester: Send + Sync {
    /// Request through the batch endpoint. True iff every key was accepted.
    async fn request_all_transactions_from_node(&self, url: &str) -> bool;

    /// Request through the legacy endpoint. True iff every key was accepted.
    async fn request_all_transactions_from_legacy_node(&self, url: &str) -> bool;
}

/// Stores one recovered payload - outbound port.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Validate and store `payload`, merging with any stored copy.
    async fn store_payload(
        &self,
        payload: EncodedPayload,
    ) -> Result<MessageHash, StorePayloadError>;
}

#[cfg(any(test, feature = "test-utils"))]
mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    /// Mock requester with per-url failures.
    #[derive(Default)]
    pub struct MockTransactionRequester {
        /// Urls whose requests fail.
        pub failing_urls: Mutex<HashSet<String>>,
        /// Recorded (url, legacy) requests.
        pub requests: Mutex<Vec<(String, bool)>>,
    }

    impl MockTransactionRequester {
        /// Create a succeeding mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every request to `url`.
        pub fn fail_for(self, url: &str) -> Self {
            self.failing_urls.lock().insert(url.to_string());
            self
        }

        fn record(&self, url: &str, legacy: bool) -> bool {
            self.requests.lock().push((url.to_string(), legacy));
            !self.failing_urls.lock().contains(url)
        }
    }

    #[async_trait]
    impl BatchTransactionRequester for MockTransactionRequester {
        async fn request_all_transactions_from_node(&self, url: &str) -> bool {
            self.record(url, false)
        }

        async fn request_all_transactions_from_legacy_node(&self, url: &str) -> bool {
            self.record(url, true)
        }
    }

    /// Mock payload store recording every call.
    #[derive(Default)]
    pub struct MockPayloadStore {
        /// Payloads passed to `store_payload`, in order.
        pub stored: Mutex<Vec<EncodedPayload>>,
        /// Hashes whose store fails with a privacy violation.
        pub failing: Mutex<HashSet<MessageHash>>,
        /// Error returned for every call, if set.
        pub fail_all_with: Mutex<Option<StorePayloadError>>,
    }

    impl MockPayloadStore {
        /// Create a succeeding mock.
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every store of `hash`.
        pub fn fail_for(self, hash: MessageHash) -> Self {
            self.failing.lock().insert(hash);
            self
        }

        /// Fail every call with `error`.
        pub fn failing_with(self, error: StorePayloadError) -> Self {
            *self.fail_all_with.lock() = Some(error);
            self
        }

        /// Number of `store_payload` calls.
        pub fn call_count(&self) -> usize {
            self.stored.lock().len()
        }
    }

    #[async_trait]
    impl PayloadStore for MockPayloadStore {
        async fn store_payload(
            &self,
            payload: EncodedPayload,
        ) -> Result<MessageHash, StorePayloadError> {
            let hash = payload.hash();
            self.stored.lock().push(payload);
            if let Some(err) = self.fail_all_with.lock().clone() {
                return Err(err);
            }
            if self.failing.lock().contains(&hash) {
                return Err(StorePayloadError::PrivacyViolation {
                    hash,
                    reason: "rejected by mock".to_string(),
                });
            }
            Ok(hash)
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mocks::{MockPayloadStore, MockTransactionRequester};
