//! # Resend Messages
//!
//! Requests and responses exchanged with peers.

use serde::{Deserialize, Serialize};
use shared_types::{EncodedPayload, MessageHash, PublicKey};

/// Ask a peer to push every transaction involving `public_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendBatchRequest {
    /// Key whose transactions are wanted.
    pub public_key: PublicKey,
    /// Preferred push batch size.
    pub batch_size: Option<usize>,
}

impl ResendBatchRequest {
    /// Create a request with a preferred batch size.
    pub fn new(public_key: PublicKey, batch_size: Option<usize>) -> Self {
        Self {
            public_key,
            batch_size,
        }
    }
}

/// Number of transactions pushed in answer to a [`ResendBatchRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendBatchResponse {
    /// Transactions published.
    pub total: u64,
}

/// A batch of payloads pushed to a recovering peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PushBatchRequest {
    /// Payloads, already stripped to the recipient's view.
    pub payloads: Vec<EncodedPayload>,
}

/// Legacy resend request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResendRequestKind {
    /// Resend every transaction for the recipient.
    All,
    /// Return one transaction.
    Individual,
}

/// Legacy resend request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendRequest {
    /// Request kind.
    pub kind: ResendRequestKind,
    /// Key asking for the resend.
    pub recipient: PublicKey,
    /// Transaction hash, for [`ResendRequestKind::Individual`].
    pub hash: Option<MessageHash>,
}

impl ResendRequest {
    /// Request every transaction for `recipient`.
    pub fn all(recipient: PublicKey) -> Self {
        Self {
            kind: ResendRequestKind::All,
            recipient,
            hash: None,
        }
    }

    /// Request a single transaction.
    pub fn individual(recipient: PublicKey, hash: MessageHash) -> Self {
        Self {
            kind: ResendRequestKind::Individual,
            recipient,
            hash: Some(hash),
        }
    }
}

/// Legacy resend response. Carries a payload for individual requests only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResendResponse {
    /// The requested payload.
    pub payload: Option<EncodedPayload>,
}

impl ResendResponse {
    /// Response carrying a payload.
    pub fn with_payload(payload: EncodedPayload) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}
