//! # Shared Error Types
//!
//! Errors raised by the outbound ports and by payload manipulation. Subsystem
//! crates wrap these in their own domain errors.

use thiserror::Error;

use crate::entities::PublicKey;

/// Errors from payload construction and manipulation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The key is not one of the payload's recipients.
    #[error("Key {0} is not a recipient of this payload")]
    InvalidRecipient(PublicKey),

    /// The recipient has no box in the payload.
    #[error("No recipient box present for key {0}")]
    MissingRecipientBox(PublicKey),

    /// Malformed public key.
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// Unknown privacy mode code.
    #[error("Unknown privacy mode code: {0}")]
    UnknownPrivacyMode(u8),
}

/// Errors from transaction stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store rejected the operation.
    #[error("Database error: {0}")]
    Database(String),

    /// The backing store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the enclave.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnclaveError {
    /// The enclave is not running.
    #[error("Enclave is not available")]
    NotAvailable,

    /// The payload could not be opened with the given key.
    #[error("Unable to decrypt payload with key {0}")]
    DecryptionFailed(PublicKey),

    /// A remote enclave returned an error.
    #[error("Remote enclave error: {0}")]
    Remote(String),
}

/// Errors from discovery lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No known node hosts the key.
    #[error("No node found hosting key {0}")]
    KeyNotFound(PublicKey),
}

/// Errors from pushing payloads to peers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The peer could not be reached.
    #[error("Node {url} is offline")]
    NodeOffline {
        /// URL of the unreachable peer.
        url: String,
    },

    /// The peer answered with an error.
    #[error("Node {url} rejected publish: {reason}")]
    Rejected {
        /// URL of the peer.
        url: String,
        /// Reason reported by the peer.
        reason: String,
    },

    /// No peer hosts the recipient key.
    #[error("No node found hosting key {0}")]
    KeyNotFound(PublicKey),

    /// The publish was abandoned after another publish failed.
    #[error("Publish cancelled")]
    Cancelled,
}

impl From<DiscoveryError> for PublishError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::KeyNotFound(key) => PublishError::KeyNotFound(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PublishError::NodeOffline {
            url: "http://peer".into(),
        };
        assert!(err.to_string().contains("http://peer"));

        let err = StoreError::Database("disk full".into());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_discovery_error_converts() {
        let key = PublicKey([4; 32]);
        let err: PublishError = DiscoveryError::KeyNotFound(key).into();
        assert_eq!(err, PublishError::KeyNotFound(key));
    }
}
