//! # Legacy Resend Manager
//!
//! Resend for peers that predate batch recovery. Only standard private
//! transactions are served.

use std::sync::Arc;

use async_trait::async_trait;
use pr_01_payload_merge::calculate_batch_count;
use shared_types::{
    Discovery, Enclave, EncodedPayload, EncryptedTransaction, EncryptedTransactionStore,
    PrivacyMode, PublicKey,
};
use tracing::{debug, info};

use crate::adapters::AsyncBatchPayloadPublisher;
use crate::config::ResendConfig;
use crate::domain::{
    BatchWorkflowContext, ResendError, ResendRequest, ResendRequestKind, ResendResponse,
};
use crate::ports::LegacyResendManager;
use crate::workflow::{BatchWorkflowAction, LegacyWorkflowFactory, SearchRecipientKeyForPayload};

/// Legacy peers receive payloads one at a time.
const LEGACY_BATCH_SIZE: usize = 1;

/// [`LegacyResendManager`] over the canonical store.
pub struct LegacyResendManagerImpl {
    config: ResendConfig,
    enclave: Arc<dyn Enclave>,
    store: Arc<dyn EncryptedTransactionStore>,
    workflows: LegacyWorkflowFactory,
}

impl LegacyResendManagerImpl {
    /// Create a manager.
    pub fn new(
        config: ResendConfig,
        enclave: Arc<dyn Enclave>,
        discovery: Arc<dyn Discovery>,
        store: Arc<dyn EncryptedTransactionStore>,
        publisher: Arc<AsyncBatchPayloadPublisher>,
    ) -> Self {
        Self {
            config,
            workflows: LegacyWorkflowFactory::new(enclave.clone(), discovery, publisher),
            enclave,
            store,
        }
    }

    async fn resend_all(&self, recipient: PublicKey) -> Result<ResendResponse, ResendError> {
        let page_size = self.config.fetch_size.max(1);
        let transaction_count = self.store.transaction_count()?;
        let pages = calculate_batch_count(page_size as u64, transaction_count);

        let mut workflow = self.workflows.create(transaction_count);
        for page in 0..pages {
            let rows = self
                .store
                .retrieve_transactions(page * page_size as u64, page_size)?;
            for transaction in rows {
                let mut context =
                    BatchWorkflowContext::new(transaction, recipient, LEGACY_BATCH_SIZE);
                workflow.execute(&mut context).await?;
            }
        }
        workflow.finish().await;

        info!(
            "[pr-02] legacy resend to {}: {} published, {} failed",
            recipient,
            workflow.published_count(),
            workflow.failed_count()
        );
        Ok(ResendResponse::default())
    }

    async fn resend_individual(
        &self,
        recipient: PublicKey,
        request: &ResendRequest,
    ) -> Result<ResendResponse, ResendError> {
        let hash = request
            .hash
            .clone()
            .ok_or_else(|| ResendError::InvalidRequest("individual resend without hash".into()))?;

        let transaction = self
            .store
            .retrieve_by_hash(&hash)?
            .ok_or_else(|| ResendError::TransactionNotFound(hash.clone()))?;

        if transaction.payload.privacy_mode != PrivacyMode::StandardPrivate {
            return Err(ResendError::EnhancedPrivacyNotSupported(hash));
        }

        let payload = if transaction.payload.sender_key == recipient {
            self.rebuild_for_sender(transaction, recipient).await?
        } else {
            transaction.payload.for_recipient(&recipient)?
        };
        debug!("[pr-02] individual resend of {} to {}", hash, recipient);
        Ok(ResendResponse::with_payload(payload))
    }

    /// The sender gets the full payload back. Every box is split into its
    /// own keyless payload and its key recovered by test decryption.
    async fn rebuild_for_sender(
        &self,
        transaction: EncryptedTransaction,
        sender: PublicKey,
    ) -> Result<EncodedPayload, ResendError> {
        let payload = transaction.payload.clone();
        let split = payload
            .recipient_boxes
            .iter()
            .map(|rbox| {
                payload
                    .clone()
                    .with_recipient_keys(Vec::new())
                    .with_recipient_boxes(vec![rbox.clone()])
            })
            .collect();
        let mut context = BatchWorkflowContext::new(transaction, sender, LEGACY_BATCH_SIZE)
            .with_payloads_to_publish(split);

        SearchRecipientKeyForPayload::new(self.enclave.clone())
            .execute(&mut context)
            .await?;

        let mut keys = Vec::with_capacity(context.payloads_to_publish.len());
        let mut boxes = Vec::with_capacity(context.payloads_to_publish.len());
        for view in context.payloads_to_publish {
            keys.extend(view.recipient_keys.into_iter().take(1));
            boxes.extend(view.recipient_boxes.into_iter().take(1));
        }

        Ok(payload.with_recipient_keys(keys).with_recipient_boxes(boxes))
    }
}

#[async_trait]
impl LegacyResendManager for LegacyResendManagerImpl {
    async fn resend(&self, request: ResendRequest) -> Result<ResendResponse, ResendError> {
        match request.kind {
            ResendRequestKind::All => self.resend_all(request.recipient).await,
            ResendRequestKind::Individual => {
                self.resend_individual(request.recipient, &request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockPayloadPublisher;
    use shared_types::testing::{sample_key, sample_payload, sample_payload_for, FakeEnclave};
    use shared_types::{
        InMemoryEncryptedTransactionStore, MessageHash, NodeInfo, Recipient, StaticDiscovery,
    };
    use std::collections::BTreeSet;

    fn manager(
        enclave_keys: Vec<PublicKey>,
        rows: Vec<EncryptedTransaction>,
    ) -> (Arc<MockPayloadPublisher>, LegacyResendManagerImpl) {
        let discovery = Arc::new(StaticDiscovery::new(
            NodeInfo::new(
                "http://me",
                vec![Recipient::new(sample_key(1), "http://me")],
                BTreeSet::new(),
            ),
            vec![NodeInfo::new(
                "http://peer",
                vec![Recipient::new(sample_key(2), "http://peer")],
                BTreeSet::new(),
            )],
        ));
        let mock = Arc::new(MockPayloadPublisher::new());
        let publisher = Arc::new(AsyncBatchPayloadPublisher::new(mock.clone(), 2));
        let manager = LegacyResendManagerImpl::new(
            ResendConfig::for_testing(),
            Arc::new(FakeEnclave::new(enclave_keys)),
            discovery,
            Arc::new(InMemoryEncryptedTransactionStore::with_transactions(rows)),
            publisher,
        );
        (mock, manager)
    }

    fn standard(cipher: &[u8], recipients: &[PublicKey]) -> EncryptedTransaction {
        EncryptedTransaction::new(sample_payload_for(
            sample_key(1),
            cipher,
            recipients,
            PrivacyMode::StandardPrivate,
        ))
    }

    #[tokio::test]
    async fn test_individual_not_found() {
        let (_, manager) = manager(vec![sample_key(1)], vec![]);
        let hash = MessageHash::of(b"missing");

        let result = manager
            .resend(ResendRequest::individual(sample_key(2), hash.clone()))
            .await;
        assert_eq!(result, Err(ResendError::TransactionNotFound(hash)));
    }

    #[tokio::test]
    async fn test_individual_rejects_enhanced_privacy() {
        let tx = EncryptedTransaction::new(sample_payload_for(
            sample_key(1),
            b"pp",
            &[sample_key(2)],
            PrivacyMode::PartyProtection,
        ));
        let hash = tx.hash.clone();
        let (_, manager) = manager(vec![sample_key(1)], vec![tx]);

        let result = manager
            .resend(ResendRequest::individual(sample_key(2), hash.clone()))
            .await;
        assert_eq!(result, Err(ResendError::EnhancedPrivacyNotSupported(hash)));
    }

    #[tokio::test]
    async fn test_individual_for_recipient() {
        let tx = standard(b"tx", &[sample_key(2), sample_key(3)]);
        let hash = tx.hash.clone();
        let (_, manager) = manager(vec![sample_key(1)], vec![tx]);

        let response = manager
            .resend(ResendRequest::individual(sample_key(3), hash))
            .await
            .unwrap();

        let payload = response.payload.unwrap();
        assert_eq!(payload.recipient_keys, vec![sample_key(3)]);
        assert_eq!(payload.recipient_boxes, vec![FakeEnclave::box_for(&sample_key(3))]);
    }

    #[tokio::test]
    async fn test_individual_for_sender_recovers_keys() {
        let (r1, r2) = (sample_key(2), sample_key(3));
        let tx = EncryptedTransaction::new(
            sample_payload(sample_key(1), b"legacy")
                .with_recipient_box(FakeEnclave::box_for(&r1))
                .with_recipient_box(FakeEnclave::box_for(&r2)),
        );
        let hash = tx.hash.clone();
        let (_, manager) = manager(vec![r1, r2], vec![tx]);

        let response = manager
            .resend(ResendRequest::individual(sample_key(1), hash))
            .await
            .unwrap();

        let payload = response.payload.unwrap();
        assert_eq!(payload.recipient_keys, vec![r1, r2]);
        assert_eq!(payload.recipient_boxes.len(), 2);
    }

    #[tokio::test]
    async fn test_individual_for_sender_keeps_unrecorded_boxes() {
        let (r1, r2) = (sample_key(2), sample_key(3));
        let tx = EncryptedTransaction::new(
            sample_payload(sample_key(1), b"partial")
                .with_recipient_keys(vec![r1])
                .with_recipient_box(FakeEnclave::box_for(&r1))
                .with_recipient_box(FakeEnclave::box_for(&r2)),
        );
        let hash = tx.hash.clone();
        let (_, manager) = manager(vec![r1, r2], vec![tx]);

        let response = manager
            .resend(ResendRequest::individual(sample_key(1), hash))
            .await
            .unwrap();

        let payload = response.payload.unwrap();
        assert_eq!(payload.recipient_keys, vec![r1, r2]);
        assert_eq!(
            payload.recipient_boxes,
            vec![FakeEnclave::box_for(&r1), FakeEnclave::box_for(&r2)]
        );
    }

    #[tokio::test]
    async fn test_individual_without_hash_is_invalid() {
        let (_, manager) = manager(vec![sample_key(1)], vec![]);
        let mut request = ResendRequest::all(sample_key(2));
        request.kind = ResendRequestKind::Individual;

        assert!(matches!(
            manager.resend(request).await,
            Err(ResendError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_resend_all_publishes_standard_only() {
        let mut rows: Vec<_> = (0..4u8)
            .map(|i| standard(&[b'a', i], &[sample_key(2)]))
            .collect();
        rows.push(EncryptedTransaction::new(sample_payload_for(
            sample_key(1),
            b"pp",
            &[sample_key(2)],
            PrivacyMode::PartyProtection,
        )));
        let (mock, manager) = manager(vec![sample_key(1)], rows);

        let response = manager.resend(ResendRequest::all(sample_key(2))).await.unwrap();

        assert_eq!(response, ResendResponse::default());
        assert_eq!(mock.published_count(), 4);
    }

    #[tokio::test]
    async fn test_resend_all_skips_recipient_without_box() {
        let (peer, other) = (sample_key(2), sample_key(3));
        let tx = EncryptedTransaction::new(
            sample_payload(sample_key(1), b"unboxed")
                .with_recipient_keys(vec![other, peer])
                .with_recipient_box(FakeEnclave::box_for(&other)),
        );
        let (mock, manager) = manager(vec![sample_key(1)], vec![tx]);

        manager.resend(ResendRequest::all(peer)).await.unwrap();

        assert_eq!(mock.published_count(), 0);
    }
}
