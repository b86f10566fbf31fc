//! # Batch Workflow Context
//!
//! Scratch state for one transaction's pass through the batch workflow.

use shared_types::{EncodedPayload, EncryptedTransaction, PublicKey, Recipient};

/// Per-transaction workflow state. Owned by a single execution.
#[derive(Debug, Clone)]
pub struct BatchWorkflowContext {
    /// Transaction being processed.
    pub encrypted_transaction: EncryptedTransaction,
    /// Its payload.
    pub encoded_payload: EncodedPayload,
    /// Key that asked for the resend.
    pub recipient_key: PublicKey,
    /// Resolved network location of `recipient_key`.
    pub recipient: Option<Recipient>,
    /// Payloads prepared for publishing.
    pub payloads_to_publish: Vec<EncodedPayload>,
    /// Publish batch size.
    pub batch_size: usize,
    /// Transactions still expected to be published in this run.
    pub expected_total: u64,
}

impl BatchWorkflowContext {
    /// Start processing `transaction` on behalf of `recipient_key`.
    pub fn new(
        transaction: EncryptedTransaction,
        recipient_key: PublicKey,
        batch_size: usize,
    ) -> Self {
        Self {
            encoded_payload: transaction.payload.clone(),
            encrypted_transaction: transaction,
            recipient_key,
            recipient: None,
            payloads_to_publish: Vec::new(),
            batch_size,
            expected_total: 0,
        }
    }

    /// Replace the prepared payloads.
    pub fn with_payloads_to_publish(mut self, payloads: Vec<EncodedPayload>) -> Self {
        self.payloads_to_publish = payloads;
        self
    }

    /// Whether the requesting key sent this transaction.
    pub fn target_is_sender(&self) -> bool {
        self.encoded_payload.sender_key == self.recipient_key
    }
}
