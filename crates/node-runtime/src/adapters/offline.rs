//! # Offline Transport
//!
//! Stand-ins for every remote collaborator that fail immediately. Used for
//! dry runs (`transport.kind = "offline"`), where only local data is touched.

use async_trait::async_trait;
use pr_02_resend::{
    PayloadPublisher, PrivacyGroupPublisher, PushBatchRequest, RecoveryClient, ResendBatchRequest,
    ResendBatchResponse, ResendRequest, ResendResponse,
};
use shared_types::{
    EncodedPayload, Enclave, EnclaveError, PublicKey, PublishError, RecipientBox, ServiceStatus,
};

fn offline(url: &str) -> PublishError {
    PublishError::NodeOffline {
        url: url.to_string(),
    }
}

fn offline_recipient(recipient: &PublicKey) -> PublishError {
    offline(&format!("offline://{}", recipient))
}

/// Peer client that never reaches a peer.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflinePeerClient;

#[async_trait]
impl RecoveryClient for OfflinePeerClient {
    async fn make_batch_resend_request(
        &self,
        url: &str,
        _request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, PublishError> {
        Err(offline(url))
    }

    async fn make_resend_request(
        &self,
        url: &str,
        _request: ResendRequest,
    ) -> Result<ResendResponse, PublishError> {
        Err(offline(url))
    }

    async fn push_batch(&self, url: &str, _request: PushBatchRequest) -> Result<(), PublishError> {
        Err(offline(url))
    }
}

#[async_trait]
impl PayloadPublisher for OfflinePeerClient {
    async fn publish_payload(
        &self,
        _payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<(), PublishError> {
        Err(offline_recipient(recipient))
    }
}

#[async_trait]
impl PrivacyGroupPublisher for OfflinePeerClient {
    async fn publish_privacy_group(
        &self,
        _data: &[u8],
        recipient: &PublicKey,
    ) -> Result<(), PublishError> {
        Err(offline_recipient(recipient))
    }
}

/// Enclave that is never started.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineEnclave;

#[async_trait]
impl Enclave for OfflineEnclave {
    async fn status(&self) -> ServiceStatus {
        ServiceStatus::Stopped
    }

    async fn public_keys(&self) -> Result<Vec<PublicKey>, EnclaveError> {
        Err(EnclaveError::NotAvailable)
    }

    async fn unencrypt_transaction(
        &self,
        _payload: &EncodedPayload,
        _key: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        Err(EnclaveError::NotAvailable)
    }

    async fn create_new_recipient_box(
        &self,
        _payload: &EncodedPayload,
        _recipient: &PublicKey,
    ) -> Result<RecipientBox, EnclaveError> {
        Err(EnclaveError::NotAvailable)
    }
}
