//! # Domain Errors
//!
//! Error types for recovery and for storing recovered payloads.

use pr_02_resend::ResendError;
use shared_types::{EnclaveError, MessageHash, StoreError};
use thiserror::Error;

/// Recovery errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecoveryError {
    /// The staging area is not empty or cannot be queried.
    #[error("Staging area precheck failed: {0}")]
    Precheck(String),
}

/// Errors storing one recovered payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorePayloadError {
    /// The payload references transactions it may not see.
    #[error("Privacy violation for {hash}: {reason}")]
    PrivacyViolation {
        /// Payload hash.
        hash: MessageHash,
        /// What was violated.
        reason: String,
    },

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Enclave failure.
    #[error("Enclave error: {0}")]
    Enclave(#[from] EnclaveError),

    /// Re-accepting one of our own payloads failed.
    #[error("Resend error: {0}")]
    Resend(#[from] ResendError),
}

impl StorePayloadError {
    /// Whether the failure is confined to this payload. Anything else means
    /// every later payload would fail the same way.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorePayloadError::PrivacyViolation { .. } | StorePayloadError::Store(_) => true,
            StorePayloadError::Enclave(err) => is_payload_specific(err),
            StorePayloadError::Resend(ResendError::EnclaveUnavailable) => false,
            StorePayloadError::Resend(ResendError::Enclave(err)) => is_payload_specific(err),
            StorePayloadError::Resend(_) => true,
        }
    }
}

fn is_payload_specific(err: &EnclaveError) -> bool {
    matches!(err, EnclaveError::DecryptionFailed(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorePayloadError::PrivacyViolation {
            hash: MessageHash(vec![0xab]),
            reason: "affected transaction missing".to_string(),
        };
        assert!(err.to_string().contains("affected transaction missing"));

        let err = RecoveryError::Precheck("staging not empty".to_string());
        assert!(err.to_string().contains("staging not empty"));
    }

    #[test]
    fn test_recoverable() {
        let violation = StorePayloadError::PrivacyViolation {
            hash: MessageHash(vec![1]),
            reason: String::new(),
        };
        assert!(violation.is_recoverable());
        assert!(StorePayloadError::Store(StoreError::Unavailable("down".into())).is_recoverable());
        let invalid = ResendError::InvalidPayload(MessageHash(vec![1]));
        assert!(StorePayloadError::Resend(invalid).is_recoverable());
        assert!(!StorePayloadError::Enclave(EnclaveError::NotAvailable).is_recoverable());
        assert!(!StorePayloadError::Resend(ResendError::EnclaveUnavailable).is_recoverable());
    }
}
