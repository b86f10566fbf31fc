//! # Test Utilities
//!
//! A deterministic enclave fake and sample data builders. Available to other
//! crates through the `test-utils` feature.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entities::{
    EncodedPayload, EncryptedTransaction, Nonce, PrivacyMode, PublicKey, RecipientBox,
};
use crate::errors::EnclaveError;
use crate::ports::{Enclave, ServiceStatus};

/// Deterministic key for tests.
pub fn sample_key(n: u8) -> PublicKey {
    PublicKey([n; 32])
}

/// A standard private payload from `sender` with no recipients.
pub fn sample_payload(sender: PublicKey, cipher: &[u8]) -> EncodedPayload {
    EncodedPayload::new(
        sender,
        cipher.to_vec(),
        Nonce(b"cipher-nonce".to_vec()),
        Nonce(b"recipient-nonce".to_vec()),
    )
}

/// A payload with one sealed box per recipient.
pub fn sample_payload_for(
    sender: PublicKey,
    cipher: &[u8],
    recipients: &[PublicKey],
    mode: PrivacyMode,
) -> EncodedPayload {
    recipients
        .iter()
        .fold(sample_payload(sender, cipher), |payload, key| {
            payload.with_recipient(*key, FakeEnclave::box_for(key))
        })
        .with_privacy_mode(mode)
}

/// Wrap a payload in a stored row.
pub fn sample_transaction(payload: EncodedPayload) -> EncryptedTransaction {
    EncryptedTransaction::new(payload)
}

/// Enclave fake whose boxes are `owner key ++ "box"`.
///
/// A payload opens with `key` when the enclave holds `key` and either the
/// first box is sealed to `key` or `key` is the payload's sender. The
/// "plaintext" is the ciphertext itself.
pub struct FakeEnclave {
    keys: RwLock<Vec<PublicKey>>,
    available: AtomicBool,
    unstable_plaintext: AtomicBool,
    decrypt_calls: AtomicU64,
}

impl FakeEnclave {
    /// Create an enclave holding `keys`.
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self {
            keys: RwLock::new(keys),
            available: AtomicBool::new(true),
            unstable_plaintext: AtomicBool::new(false),
            decrypt_calls: AtomicU64::new(0),
        }
    }

    /// The box this fake seals for `owner`.
    pub fn box_for(owner: &PublicKey) -> RecipientBox {
        let mut data = owner.as_bytes().to_vec();
        data.extend_from_slice(b"box");
        RecipientBox(data)
    }

    /// Key a box was sealed to.
    pub fn owner_of(recipient_box: &RecipientBox) -> Option<PublicKey> {
        let bytes: [u8; 32] = recipient_box.data().get(..32)?.try_into().ok()?;
        Some(PublicKey(bytes))
    }

    /// Toggle enclave availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every decryption return a different plaintext.
    pub fn set_unstable_plaintext(&self, unstable: bool) {
        self.unstable_plaintext.store(unstable, Ordering::SeqCst);
    }

    /// Number of decrypt calls made so far.
    pub fn decrypt_calls(&self) -> u64 {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn holds(&self, key: &PublicKey) -> bool {
        self.keys.read().contains(key)
    }

    fn check_available(&self) -> Result<(), EnclaveError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EnclaveError::NotAvailable)
        }
    }
}

#[async_trait]
impl Enclave for FakeEnclave {
    async fn status(&self) -> ServiceStatus {
        if self.available.load(Ordering::SeqCst) {
            ServiceStatus::Started
        } else {
            ServiceStatus::Stopped
        }
    }

    async fn public_keys(&self) -> Result<Vec<PublicKey>, EnclaveError> {
        self.check_available()?;
        Ok(self.keys.read().clone())
    }

    async fn unencrypt_transaction(
        &self,
        payload: &EncodedPayload,
        key: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        self.check_available()?;
        let call = self.decrypt_calls.fetch_add(1, Ordering::SeqCst);

        let first_box = payload
            .recipient_boxes
            .first()
            .ok_or(EnclaveError::DecryptionFailed(*key))?;
        let sealed_to_key = Self::owner_of(first_box).as_ref() == Some(key);

        if !self.holds(key) || !(sealed_to_key || key == &payload.sender_key) {
            return Err(EnclaveError::DecryptionFailed(*key));
        }

        let mut plaintext = payload.cipher_text.clone();
        if self.unstable_plaintext.load(Ordering::SeqCst) {
            plaintext.extend_from_slice(&call.to_be_bytes());
        }
        Ok(plaintext)
    }

    async fn create_new_recipient_box(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<RecipientBox, EnclaveError> {
        self.check_available()?;
        if !self.holds(&payload.sender_key) {
            return Err(EnclaveError::DecryptionFailed(payload.sender_key));
        }
        Ok(Self::box_for(recipient))
    }
}
