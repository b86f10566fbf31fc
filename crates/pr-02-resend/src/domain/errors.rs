//! # Domain Errors
//!
//! Error types for the resend managers and the batch workflow.

use shared_types::{EnclaveError, MessageHash, PayloadError, PublishError, StoreError};
use thiserror::Error;

/// Resend error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResendError {
    /// The payload's sender is not one of this node's keys.
    #[error("Message {0} does not have one of the node's own keys as a sender")]
    UntrustedSender(MessageHash),

    /// Stored and incoming payloads do not decrypt to the same transaction.
    #[error("Invalid payload provided for message {0}")]
    InvalidPayload(MessageHash),

    /// The enclave is not running.
    #[error("Enclave is not available")]
    EnclaveUnavailable,

    /// None of the local keys opens a legacy payload box.
    #[error("No key found as recipient of message {0}")]
    RecipientKeyNotFound(MessageHash),

    /// The requested transaction is not stored.
    #[error("Message with hash {0} was not found")]
    TransactionNotFound(MessageHash),

    /// Legacy resend only handles standard private transactions.
    #[error("Cannot resend enhanced privacy transaction {0} in legacy resend")]
    EnhancedPrivacyNotSupported(MessageHash),

    /// Malformed request.
    #[error("Invalid resend request: {0}")]
    InvalidRequest(String),

    /// Enclave failure.
    #[error("Enclave error: {0}")]
    Enclave(#[from] EnclaveError),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Payload manipulation failure.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Network failure.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let hash = MessageHash::of(b"sample");
        let err = ResendError::RecipientKeyNotFound(hash.clone());
        assert!(err.to_string().contains(&hash.to_hex()));

        let err: ResendError = StoreError::Database("locked".into()).into();
        assert!(err.to_string().contains("locked"));
    }
}
