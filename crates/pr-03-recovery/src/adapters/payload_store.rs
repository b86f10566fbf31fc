//! # Merging Payload Store
//!
//! Stores recovered payloads after privacy checks. Payloads this node sent
//! go through the resend manager; everything else is merged with any stored
//! copy or saved.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use pr_01_payload_merge::merge;
use pr_02_resend::ResendManager;
use shared_types::{
    Enclave, EncodedPayload, EncryptedTransaction, EncryptedTransactionStore, MessageHash,
    PrivacyMode,
};
use tracing::{debug, warn};

use crate::domain::StorePayloadError;
use crate::ports::PayloadStore;

/// [`PayloadStore`] over the canonical store.
pub struct MergingPayloadStore {
    enclave: Arc<dyn Enclave>,
    store: Arc<dyn EncryptedTransactionStore>,
    resend_manager: Arc<dyn ResendManager>,
}

impl MergingPayloadStore {
    /// Create a store.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        store: Arc<dyn EncryptedTransactionStore>,
        resend_manager: Arc<dyn ResendManager>,
    ) -> Self {
        Self {
            enclave,
            store,
            resend_manager,
        }
    }

    /// Affected transactions found locally must share the payload's privacy
    /// mode, and their mandatory recipients must be mandatory here too. PSV
    /// payloads additionally need every affected transaction present, with
    /// the sender among its recipients and the same recipient set.
    fn check_privacy(
        &self,
        hash: &MessageHash,
        payload: &EncodedPayload,
    ) -> Result<(), StorePayloadError> {
        let violation = |reason: String| StorePayloadError::PrivacyViolation {
            hash: hash.clone(),
            reason,
        };

        let mut found = Vec::with_capacity(payload.affected_contract_transactions.len());
        for affected in payload.affected_contract_transactions.keys() {
            let affected_hash = MessageHash::from(affected);
            if let Some(transaction) = self.store.retrieve_by_hash(&affected_hash)? {
                found.push(transaction);
            }
        }

        let mode = payload.privacy_mode;
        for transaction in &found {
            let linked = &transaction.payload;
            if linked.privacy_mode != mode {
                return Err(violation(format!(
                    "affected transaction {} is {} but payload is {}",
                    transaction.hash, linked.privacy_mode, mode
                )));
            }
            let covers_mandatory = linked
                .mandatory_recipients
                .iter()
                .all(|key| payload.mandatory_recipients.contains(key));
            if !covers_mandatory {
                return Err(violation(format!(
                    "mandatory recipients of affected transaction {} not kept",
                    transaction.hash
                )));
            }
        }

        if mode != PrivacyMode::PrivateStateValidation {
            return Ok(());
        }

        if found.len() != payload.affected_contract_transactions.len() {
            return Err(violation(format!(
                "{} of {} affected transactions found",
                found.len(),
                payload.affected_contract_transactions.len()
            )));
        }

        let recipients: BTreeSet<_> = payload.recipient_keys.iter().collect();
        for transaction in &found {
            let linked = &transaction.payload;
            if !linked.recipient_keys.contains(&payload.sender_key) {
                return Err(violation(format!(
                    "sender is not a recipient of affected transaction {}",
                    transaction.hash
                )));
            }
            if linked.recipient_keys.iter().collect::<BTreeSet<_>>() != recipients {
                return Err(violation(format!(
                    "recipients differ from affected transaction {}",
                    transaction.hash
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PayloadStore for MergingPayloadStore {
    async fn store_payload(
        &self,
        payload: EncodedPayload,
    ) -> Result<MessageHash, StorePayloadError> {
        let hash = payload.hash();
        self.check_privacy(&hash, &payload)
            .inspect_err(|err| warn!("[pr-03] {}", err))?;

        if self.enclave.public_keys().await?.contains(&payload.sender_key) {
            self.resend_manager.accept_own_message(payload).await?;
            return Ok(hash);
        }

        match self.store.retrieve_by_hash(&hash)? {
            Some(existing) => {
                let merged = merge(existing.payload.clone(), payload);
                self.store.update(existing.with_payload(merged))?;
                debug!("[pr-03] merged recovered payload {}", hash);
            }
            None => {
                self.store.save(EncryptedTransaction::new(payload))?;
                debug!("[pr-03] stored recovered payload {}", hash);
            }
        }
        Ok(hash)
    }
}
