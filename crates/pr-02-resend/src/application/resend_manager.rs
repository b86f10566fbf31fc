//! # Resend Manager
//!
//! Accepts transactions this node originally sent when a peer hands them
//! back, reconciling them with whatever copy is stored locally.

use std::sync::Arc;

use async_trait::async_trait;
use pr_01_payload_merge::merge;
use shared_types::{
    Enclave, EncodedPayload, EncryptedTransaction, EncryptedTransactionStore, PrivacyMode,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::ResendError;
use crate::ports::ResendManager;

/// [`ResendManager`] over an enclave and the canonical store.
pub struct ResendManagerImpl {
    enclave: Arc<dyn Enclave>,
    store: Arc<dyn EncryptedTransactionStore>,
    lock: Mutex<()>,
}

impl ResendManagerImpl {
    /// Create a manager.
    pub fn new(enclave: Arc<dyn Enclave>, store: Arc<dyn EncryptedTransactionStore>) -> Self {
        Self {
            enclave,
            store,
            lock: Mutex::new(()),
        }
    }

    /// Decrypt with the sender key. PSV payloads being rebuilt only carry
    /// the first recipient's box, so they are opened through a standard
    /// private view holding just that box.
    async fn decrypt(&self, payload: &EncodedPayload) -> Result<Vec<u8>, ResendError> {
        let plaintext = if payload.privacy_mode == PrivacyMode::PrivateStateValidation {
            let view = payload
                .clone()
                .with_privacy_mode(PrivacyMode::StandardPrivate)
                .with_recipient_keys(payload.recipient_keys.iter().take(1).copied().collect())
                .with_recipient_boxes(payload.recipient_boxes.iter().take(1).cloned().collect())
                .with_exec_hash(Vec::new());
            self.enclave
                .unencrypt_transaction(&view, &payload.sender_key)
                .await?
        } else {
            self.enclave
                .unencrypt_transaction(payload, &payload.sender_key)
                .await?
        };
        Ok(plaintext)
    }

    async fn store_new(&self, payload: EncodedPayload) -> Result<(), ResendError> {
        let mut payload = payload;
        if !payload.has_sender_as_recipient() {
            let sender = payload.sender_key;
            payload = payload.with_recipient_key(sender);
        }

        let missing: Vec<_> = payload
            .recipient_keys
            .iter()
            .skip(payload.recipient_boxes.len())
            .copied()
            .collect();
        for key in missing {
            let recipient_box = self.enclave.create_new_recipient_box(&payload, &key).await?;
            payload = payload.with_recipient_box(recipient_box);
        }

        let transaction = EncryptedTransaction::new(payload);
        info!("[pr-02] storing own message {}", transaction.hash);
        self.store.save(transaction)?;
        Ok(())
    }

    async fn merge_existing(
        &self,
        existing: EncryptedTransaction,
        incoming: EncodedPayload,
        incoming_plaintext: Vec<u8>,
    ) -> Result<(), ResendError> {
        let already_stored = incoming
            .recipient_boxes
            .first()
            .is_some_and(|b| existing.payload.recipient_boxes.contains(b));
        if already_stored {
            debug!("[pr-02] own message {} already holds this box", existing.hash);
            return Ok(());
        }

        let existing_plaintext = self.decrypt(&existing.payload).await?;
        if existing_plaintext != incoming_plaintext
            || existing.payload.cipher_text != incoming.cipher_text
        {
            warn!("[pr-02] own message {} does not match stored copy", existing.hash);
            return Err(ResendError::InvalidPayload(existing.hash));
        }

        let merged = merge(existing.payload.clone(), incoming);
        info!("[pr-02] merged own message {}", existing.hash);
        self.store.update(existing.with_payload(merged))?;
        Ok(())
    }
}

#[async_trait]
impl ResendManager for ResendManagerImpl {
    async fn accept_own_message(&self, payload: EncodedPayload) -> Result<(), ResendError> {
        let hash = payload.hash();
        let keys = self.enclave.public_keys().await?;
        if !keys.contains(&payload.sender_key) {
            warn!("[pr-02] rejecting {}: sender is not a local key", hash);
            return Err(ResendError::UntrustedSender(hash));
        }

        let _guard = self.lock.lock().await;

        let plaintext = self.decrypt(&payload).await?;
        match self.store.retrieve_by_hash(&hash)? {
            None => self.store_new(payload).await,
            Some(existing) => self.merge_existing(existing, payload, plaintext).await,
        }
    }
}
