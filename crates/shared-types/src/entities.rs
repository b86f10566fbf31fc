//! # Core Domain Entities
//!
//! Defines the payload and transaction types the relay persists and exchanges.
//!
//! ## Clusters
//!
//! - **Keys & Hashes**: `PublicKey`, `MessageHash`, `TxHash`, `SecurityHash`
//! - **Payload**: `EncodedPayload`, `RecipientBox`, `Nonce`, `PrivacyMode`
//! - **Rows**: `EncryptedTransaction`, `StagingTransaction`, `RawTransaction`
//! - **Networking**: `NodeInfo`, `Recipient`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Sha3_512};

use crate::errors::PayloadError;

/// API version advertised by peers that understand batch recovery and
/// enhanced privacy.
pub const API_VERSION_2: &str = "v2";

/// API version advertised by every peer.
pub const API_VERSION_1: &str = "v1";

// =============================================================================
// CLUSTER A: KEYS & HASHES
// =============================================================================

/// A 32-byte NaCl public key identifying a recipient (or sender).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Create a key from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key from a 64 character hex string.
    pub fn from_hex(value: &str) -> Result<Self, PayloadError> {
        let bytes = hex::decode(value.trim())
            .map_err(|e| PayloadError::InvalidKey(format!("{value}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PayloadError::InvalidKey(format!("{value}: expected 32 bytes")))?;
        Ok(Self(bytes))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", &self.to_hex()[..8])
    }
}

/// Content hash of a payload's ciphertext (SHA3-512).
///
/// This is the identity of an `EncryptedTransaction`.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageHash(#[serde_as(as = "Bytes")] pub Vec<u8>);

impl MessageHash {
    /// Digest a ciphertext into its message hash.
    pub fn of(cipher_text: &[u8]) -> Self {
        Self(Sha3_512::digest(cipher_text).to_vec())
    }

    /// Hex encoding of the hash.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "MessageHash({}..)", &hex[..hex.len().min(12)])
    }
}

/// Hash of an affected contract transaction, as recorded inside a payload.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxHash(#[serde_as(as = "Bytes")] pub Vec<u8>);

impl From<&MessageHash> for TxHash {
    fn from(hash: &MessageHash) -> Self {
        Self(hash.0.clone())
    }
}

impl From<&TxHash> for MessageHash {
    fn from(hash: &TxHash) -> Self {
        Self(hash.0.clone())
    }
}

/// Security hash binding a PSV transaction to one of its affected transactions.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SecurityHash(#[serde_as(as = "Bytes")] pub Vec<u8>);

/// Nonce used for either the ciphertext or the recipient boxes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Nonce(#[serde_as(as = "Bytes")] pub Vec<u8>);

/// Symmetric key material sealed to exactly one recipient.
///
/// Opaque to this crate; only ever moved around as a unit, positionally
/// paired with a recipient key.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientBox(#[serde_as(as = "Bytes")] pub Vec<u8>);

impl RecipientBox {
    /// Raw sealed bytes.
    pub fn data(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for RecipientBox {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl fmt::Debug for RecipientBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientBox({} bytes)", self.0.len())
    }
}

// =============================================================================
// CLUSTER B: PAYLOAD
// =============================================================================

/// Transaction-level visibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyMode {
    /// Only recipients can read the payload.
    #[default]
    StandardPrivate,
    /// Sender is protected from being excluded from later transactions.
    PartyProtection,
    /// Every transaction must include a fixed set of recipients.
    MandatoryRecipients,
    /// All recipients hold every box so they can validate private state.
    PrivateStateValidation,
}

impl PrivacyMode {
    /// Wire code of the privacy mode.
    pub fn code(self) -> u8 {
        match self {
            Self::StandardPrivate => 0,
            Self::PartyProtection => 1,
            Self::MandatoryRecipients => 2,
            Self::PrivateStateValidation => 3,
        }
    }

    /// Whether this is one of the enhanced privacy modes.
    pub fn is_enhanced(self) -> bool {
        !matches!(self, Self::StandardPrivate)
    }
}

impl TryFrom<u8> for PrivacyMode {
    type Error = PayloadError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::StandardPrivate),
            1 => Ok(Self::PartyProtection),
            2 => Ok(Self::MandatoryRecipients),
            3 => Ok(Self::PrivateStateValidation),
            other => Err(PayloadError::UnknownPrivacyMode(other)),
        }
    }
}

impl fmt::Display for PrivacyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StandardPrivate => "STANDARD_PRIVATE",
            Self::PartyProtection => "PARTY_PROTECTION",
            Self::MandatoryRecipients => "MANDATORY_RECIPIENTS",
            Self::PrivateStateValidation => "PRIVATE_STATE_VALIDATION",
        };
        f.write_str(name)
    }
}

/// An encrypted transaction payload as stored and exchanged between nodes.
///
/// `recipient_boxes[i]` belongs to `recipient_keys[i]`. The two lists are not
/// required to have the same length: legacy senders record boxes without
/// keys, and PSV payloads being rebuilt may hold keys without boxes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedPayload {
    /// Key of the node that created the transaction.
    pub sender_key: PublicKey,
    /// Encrypted transaction body.
    #[serde_as(as = "Bytes")]
    pub cipher_text: Vec<u8>,
    /// Nonce used for the body encryption.
    pub cipher_text_nonce: Nonce,
    /// Ordered recipient keys.
    pub recipient_keys: Vec<PublicKey>,
    /// Boxes, positionally aligned with `recipient_keys`.
    pub recipient_boxes: Vec<RecipientBox>,
    /// Nonce used for sealing the boxes.
    pub recipient_nonce: Nonce,
    /// Privacy policy of the transaction.
    pub privacy_mode: PrivacyMode,
    /// Affected contract transactions and their security hashes.
    pub affected_contract_transactions: BTreeMap<TxHash, SecurityHash>,
    /// Execution hash (PSV only).
    #[serde_as(as = "Bytes")]
    pub exec_hash: Vec<u8>,
    /// Mandatory recipients (MANDATORY_RECIPIENTS only).
    pub mandatory_recipients: Vec<PublicKey>,
}

impl EncodedPayload {
    /// Create a standard private payload with no recipients.
    pub fn new(
        sender_key: PublicKey,
        cipher_text: Vec<u8>,
        cipher_text_nonce: Nonce,
        recipient_nonce: Nonce,
    ) -> Self {
        Self {
            sender_key,
            cipher_text,
            cipher_text_nonce,
            recipient_keys: Vec::new(),
            recipient_boxes: Vec::new(),
            recipient_nonce,
            privacy_mode: PrivacyMode::StandardPrivate,
            affected_contract_transactions: BTreeMap::new(),
            exec_hash: Vec::new(),
            mandatory_recipients: Vec::new(),
        }
    }

    /// Replace the recipient key list.
    pub fn with_recipient_keys(mut self, keys: Vec<PublicKey>) -> Self {
        self.recipient_keys = keys;
        self
    }

    /// Replace the recipient box list.
    pub fn with_recipient_boxes(mut self, boxes: Vec<RecipientBox>) -> Self {
        self.recipient_boxes = boxes;
        self
    }

    /// Append one recipient key.
    pub fn with_recipient_key(mut self, key: PublicKey) -> Self {
        self.recipient_keys.push(key);
        self
    }

    /// Append one recipient box.
    pub fn with_recipient_box(mut self, recipient_box: RecipientBox) -> Self {
        self.recipient_boxes.push(recipient_box);
        self
    }

    /// Append a recipient key together with its box.
    pub fn with_recipient(self, key: PublicKey, recipient_box: RecipientBox) -> Self {
        self.with_recipient_key(key).with_recipient_box(recipient_box)
    }

    /// Replace the privacy mode.
    pub fn with_privacy_mode(mut self, mode: PrivacyMode) -> Self {
        self.privacy_mode = mode;
        self
    }

    /// Replace the affected contract transactions.
    pub fn with_affected_contract_transactions(
        mut self,
        affected: BTreeMap<TxHash, SecurityHash>,
    ) -> Self {
        self.affected_contract_transactions = affected;
        self
    }

    /// Replace the execution hash.
    pub fn with_exec_hash(mut self, exec_hash: Vec<u8>) -> Self {
        self.exec_hash = exec_hash;
        self
    }

    /// Replace the mandatory recipients.
    pub fn with_mandatory_recipients(mut self, keys: Vec<PublicKey>) -> Self {
        self.mandatory_recipients = keys;
        self
    }

    /// Content hash of the ciphertext.
    pub fn hash(&self) -> MessageHash {
        MessageHash::of(&self.cipher_text)
    }

    /// Whether the sender appears in its own recipient list.
    pub fn has_sender_as_recipient(&self) -> bool {
        self.recipient_keys.contains(&self.sender_key)
    }

    /// Whether every recipient key has a box.
    pub fn has_complete_boxes(&self) -> bool {
        self.recipient_boxes.len() == self.recipient_keys.len()
    }

    /// Recipient keys that have a box at the same position.
    pub fn boxed_recipients(&self) -> &[PublicKey] {
        let boxed = self.recipient_boxes.len().min(self.recipient_keys.len());
        &self.recipient_keys[..boxed]
    }

    /// Strip the payload down to the view a single recipient may see.
    ///
    /// Only the recipient's own box is kept. PSV payloads keep the full
    /// recipient key list (with the target moved to the front) because
    /// recipients validate against it.
    pub fn for_recipient(&self, recipient: &PublicKey) -> Result<Self, PayloadError> {
        let index = self
            .recipient_keys
            .iter()
            .position(|key| key == recipient)
            .ok_or(PayloadError::InvalidRecipient(*recipient))?;

        let recipient_box = self
            .recipient_boxes
            .get(index)
            .cloned()
            .ok_or(PayloadError::MissingRecipientBox(*recipient))?;

        let keys = if self.privacy_mode == PrivacyMode::PrivateStateValidation {
            std::iter::once(*recipient)
                .chain(self.recipient_keys.iter().copied().filter(|k| k != recipient))
                .collect()
        } else {
            vec![*recipient]
        };

        Ok(self
            .clone()
            .with_recipient_keys(keys)
            .with_recipient_boxes(vec![recipient_box]))
    }
}

// =============================================================================
// CLUSTER C: ROWS
// =============================================================================

/// A payload persisted in the canonical transaction store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedTransaction {
    /// Content hash of the payload ciphertext.
    pub hash: MessageHash,
    /// The stored payload.
    pub payload: EncodedPayload,
}

impl EncryptedTransaction {
    /// Wrap a payload, deriving its hash from the ciphertext.
    pub fn new(payload: EncodedPayload) -> Self {
        Self {
            hash: payload.hash(),
            payload,
        }
    }

    /// Same row with a replaced payload.
    pub fn with_payload(self, payload: EncodedPayload) -> Self {
        Self {
            hash: self.hash,
            payload,
        }
    }
}

/// One payload version received from one peer during recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingTransaction {
    /// Content hash of the payload ciphertext.
    pub hash: MessageHash,
    /// The payload as pushed by the peer.
    pub payload: EncodedPayload,
    /// Stage number assigned during the staging phase.
    pub stage: Option<u64>,
}

impl StagingTransaction {
    /// Create an unstaged row for a pushed payload.
    pub fn new(payload: EncodedPayload) -> Self {
        Self {
            hash: payload.hash(),
            payload,
            stage: None,
        }
    }

    /// Privacy mode of the carried payload.
    pub fn privacy_mode(&self) -> PrivacyMode {
        self.payload.privacy_mode
    }

    /// Hashes of the transactions this row depends on.
    pub fn affected_hashes(&self) -> impl Iterator<Item = MessageHash> + '_ {
        self.payload
            .affected_contract_transactions
            .keys()
            .map(MessageHash::from)
    }
}

/// An unvalidated input blob keyed by content hash. Never revised.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Content hash of the encrypted payload.
    pub hash: MessageHash,
    /// Encrypted payload bytes.
    #[serde_as(as = "Bytes")]
    pub encrypted_payload: Vec<u8>,
    /// Encrypted symmetric key.
    #[serde_as(as = "Bytes")]
    pub encrypted_key: Vec<u8>,
    /// Nonce of the payload encryption.
    pub nonce: Nonce,
    /// Key of the submitting node.
    pub sender: PublicKey,
}

impl RawTransaction {
    /// Create a raw row, deriving the hash from the encrypted payload.
    pub fn new(
        encrypted_payload: Vec<u8>,
        encrypted_key: Vec<u8>,
        nonce: Nonce,
        sender: PublicKey,
    ) -> Self {
        Self {
            hash: MessageHash::of(&encrypted_payload),
            encrypted_payload,
            encrypted_key,
            nonce,
            sender,
        }
    }
}

// =============================================================================
// CLUSTER D: NETWORKING
// =============================================================================

/// A recipient key hosted by a node at a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Recipient {
    /// Hosted key.
    pub key: PublicKey,
    /// URL of the hosting node.
    pub url: String,
}

impl Recipient {
    /// Create a recipient entry.
    pub fn new(key: PublicKey, url: impl Into<String>) -> Self {
        Self {
            key,
            url: url.into(),
        }
    }
}

/// What a node knows about another node (or itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Base URL of the node.
    pub url: String,
    /// Keys hosted by the node.
    pub recipients: Vec<Recipient>,
    /// API versions the node advertises.
    pub supported_api_versions: BTreeSet<String>,
}

impl NodeInfo {
    /// Create a node info entry.
    pub fn new(
        url: impl Into<String>,
        recipients: Vec<Recipient>,
        supported_api_versions: BTreeSet<String>,
    ) -> Self {
        Self {
            url: url.into(),
            recipients,
            supported_api_versions,
        }
    }

    /// Whether the node understands batch recovery.
    pub fn supports_batch_recovery(&self) -> bool {
        self.supported_api_versions.contains(API_VERSION_2)
    }

    /// Whether the node hosts `key`.
    pub fn hosts(&self, key: &PublicKey) -> bool {
        self.recipients.iter().any(|r| &r.key == key)
    }
}

/// Normalize a node URL for comparisons (trailing slash insensitive).
pub fn normalize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
