//! # Outbound Ports
//!
//! Traits for the collaborators every subsystem depends on: the enclave,
//! peer discovery and the transaction stores.
//!
//! Stores are synchronous and take `&self`; implementations provide their own
//! interior locking. The enclave is async because production enclaves live
//! behind a network hop.

use async_trait::async_trait;

use crate::entities::{
    EncodedPayload, EncryptedTransaction, MessageHash, NodeInfo, PublicKey, RawTransaction,
    RecipientBox, StagingTransaction,
};
use crate::errors::{DiscoveryError, EnclaveError, StoreError};

/// Whether a service is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Service is up.
    Started,
    /// Service is down.
    Stopped,
}

/// Enclave - outbound port.
///
/// Holds the node's private keys and performs every cryptographic operation
/// on payloads.
#[async_trait]
pub trait Enclave: Send + Sync {
    /// Current status of the enclave.
    async fn status(&self) -> ServiceStatus;

    /// Public keys whose private keys the enclave holds.
    async fn public_keys(&self) -> Result<Vec<PublicKey>, EnclaveError>;

    /// Decrypt a payload's ciphertext using the box belonging to `key`.
    async fn unencrypt_transaction(
        &self,
        payload: &EncodedPayload,
        key: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError>;

    /// Seal the payload's symmetric key to a new recipient.
    async fn create_new_recipient_box(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<RecipientBox, EnclaveError>;
}

/// Discovery - outbound port.
///
/// The node's view of the network.
pub trait Discovery: Send + Sync {
    /// This node's own info.
    fn current(&self) -> NodeInfo;

    /// Info of every known remote node.
    fn remote_node_infos(&self) -> Vec<NodeInfo>;

    /// Info of the node hosting `key`.
    fn remote_node_info(&self, key: &PublicKey) -> Result<NodeInfo, DiscoveryError>;

    /// Forget a peer that has gone offline.
    fn remove_peer(&self, url: &str);
}

/// Canonical transaction store - outbound port.
pub trait EncryptedTransactionStore: Send + Sync {
    /// Look up a transaction by hash.
    fn retrieve_by_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<Option<EncryptedTransaction>, StoreError>;

    /// Insert a new transaction. Existing rows with the same hash are replaced.
    fn save(&self, transaction: EncryptedTransaction) -> Result<(), StoreError>;

    /// Update an existing transaction.
    fn update(&self, transaction: EncryptedTransaction) -> Result<(), StoreError>;

    /// Number of stored transactions.
    fn transaction_count(&self) -> Result<u64, StoreError>;

    /// Page through transactions in hash order.
    fn retrieve_transactions(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<EncryptedTransaction>, StoreError>;
}

/// Recovery staging area - outbound port.
pub trait StagingTransactionStore: Send + Sync {
    /// Record one received payload version.
    fn save(&self, transaction: StagingTransaction) -> Result<(), StoreError>;

    /// Assign `stage` to up to `batch_size` unstaged rows whose dependencies
    /// are all either absent or staged at an earlier stage. Returns the number
    /// of rows assigned.
    fn update_stage_for_batch(&self, batch_size: usize, stage: u64) -> Result<u64, StoreError>;

    /// Total number of staging rows.
    fn count_all(&self) -> Result<u64, StoreError>;

    /// Number of staging rows with a stage assigned.
    fn count_staged(&self) -> Result<u64, StoreError>;

    /// Number of affected-transaction links across all staging rows.
    fn count_all_affected(&self) -> Result<u64, StoreError>;

    /// Page through staged rows ordered by (stage, hash).
    fn retrieve_transaction_batch_order_by_stage_and_hash(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<StagingTransaction>, StoreError>;

    /// Remove every staging row.
    fn delete_all(&self) -> Result<(), StoreError>;
}

/// Raw transaction store - outbound port.
pub trait RawTransactionStore: Send + Sync {
    /// Look up a raw transaction by hash.
    fn retrieve_by_hash(&self, hash: &MessageHash) -> Result<Option<RawTransaction>, StoreError>;

    /// Insert a raw transaction.
    fn save(&self, transaction: RawTransaction) -> Result<(), StoreError>;

    /// Number of stored raw transactions.
    fn transaction_count(&self) -> Result<u64, StoreError>;

    /// Page through raw transactions in hash order.
    fn retrieve_transactions(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<RawTransaction>, StoreError>;
}
