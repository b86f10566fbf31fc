//! # In-Memory Adapters
//!
//! Store and discovery implementations backed by process memory. Used by the
//! node runtime (with JSON snapshots) and by every crate's tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::{
    normalize_url, EncryptedTransaction, MessageHash, NodeInfo, PublicKey, RawTransaction,
    StagingTransaction,
};
use crate::errors::{DiscoveryError, StoreError};
use crate::ports::{
    Discovery, EncryptedTransactionStore, RawTransactionStore, StagingTransactionStore,
};

/// Canonical transaction store held in a `BTreeMap` keyed by hash.
#[derive(Default)]
pub struct InMemoryEncryptedTransactionStore {
    rows: RwLock<BTreeMap<MessageHash, EncryptedTransaction>>,
}

impl InMemoryEncryptedTransactionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows.
    pub fn with_transactions(rows: impl IntoIterator<Item = EncryptedTransaction>) -> Self {
        let store = Self::new();
        {
            let mut map = store.rows.write();
            for row in rows {
                map.insert(row.hash.clone(), row);
            }
        }
        store
    }

    /// Copy of every row, in hash order.
    pub fn snapshot(&self) -> Vec<EncryptedTransaction> {
        self.rows.read().values().cloned().collect()
    }
}

impl EncryptedTransactionStore for InMemoryEncryptedTransactionStore {
    fn retrieve_by_hash(
        &self,
        hash: &MessageHash,
    ) -> Result<Option<EncryptedTransaction>, StoreError> {
        Ok(self.rows.read().get(hash).cloned())
    }

    fn save(&self, transaction: EncryptedTransaction) -> Result<(), StoreError> {
        self.rows.write().insert(transaction.hash.clone(), transaction);
        Ok(())
    }

    fn update(&self, transaction: EncryptedTransaction) -> Result<(), StoreError> {
        let mut rows = self.rows.write();
        match rows.get_mut(&transaction.hash) {
            Some(existing) => {
                *existing = transaction;
                Ok(())
            }
            None => Err(StoreError::Database(format!(
                "no transaction with hash {} to update",
                transaction.hash
            ))),
        }
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().len() as u64)
    }

    fn retrieve_transactions(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<EncryptedTransaction>, StoreError> {
        Ok(self
            .rows
            .read()
            .values()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Staging store kept in insertion order.
#[derive(Default)]
pub struct InMemoryStagingStore {
    rows: RwLock<Vec<StagingTransaction>>,
}

impl InMemoryStagingStore {
    /// Create an empty staging store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row, in insertion order.
    pub fn snapshot(&self) -> Vec<StagingTransaction> {
        self.rows.read().clone()
    }
}

impl StagingTransactionStore for InMemoryStagingStore {
    fn save(&self, transaction: StagingTransaction) -> Result<(), StoreError> {
        self.rows.write().push(transaction);
        Ok(())
    }

    fn update_stage_for_batch(&self, batch_size: usize, stage: u64) -> Result<u64, StoreError> {
        let mut rows = self.rows.write();

        // Lowest stage already assigned per hash, as seen before this batch.
        let mut staged_at: HashMap<MessageHash, u64> = HashMap::new();
        let mut present: HashSet<MessageHash> = HashSet::new();
        for row in rows.iter() {
            present.insert(row.hash.clone());
            if let Some(s) = row.stage {
                staged_at
                    .entry(row.hash.clone())
                    .and_modify(|existing| *existing = (*existing).min(s))
                    .or_insert(s);
            }
        }

        let ready: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.stage.is_none())
            .filter(|(_, row)| {
                row.affected_hashes().all(|affected| {
                    if !present.contains(&affected) {
                        return true;
                    }
                    matches!(staged_at.get(&affected), Some(s) if *s < stage)
                })
            })
            .map(|(index, _)| index)
            .take(batch_size)
            .collect();

        for &index in &ready {
            rows[index].stage = Some(stage);
        }

        debug!("[staging] assigned stage {} to {} rows", stage, ready.len());
        Ok(ready.len() as u64)
    }

    fn count_all(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().len() as u64)
    }

    fn count_staged(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().iter().filter(|r| r.stage.is_some()).count() as u64)
    }

    fn count_all_affected(&self) -> Result<u64, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .map(|r| r.payload.affected_contract_transactions.len() as u64)
            .sum())
    }

    fn retrieve_transaction_batch_order_by_stage_and_hash(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<StagingTransaction>, StoreError> {
        let rows = self.rows.read();
        let mut staged: Vec<&StagingTransaction> =
            rows.iter().filter(|r| r.stage.is_some()).collect();
        // Stable sort keeps insertion order for rows sharing (stage, hash).
        staged.sort_by(|a, b| (a.stage, &a.hash).cmp(&(b.stage, &b.hash)));

        Ok(staged
            .into_iter()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.rows.write().clear();
        Ok(())
    }
}

/// Raw transaction store held in a `BTreeMap` keyed by hash.
#[derive(Default)]
pub struct InMemoryRawTransactionStore {
    rows: RwLock<BTreeMap<MessageHash, RawTransaction>>,
}

impl InMemoryRawTransactionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rows.
    pub fn with_transactions(rows: impl IntoIterator<Item = RawTransaction>) -> Self {
        let store = Self::new();
        {
            let mut map = store.rows.write();
            for row in rows {
                map.insert(row.hash.clone(), row);
            }
        }
        store
    }

    /// Copy of every row, in hash order.
    pub fn snapshot(&self) -> Vec<RawTransaction> {
        self.rows.read().values().cloned().collect()
    }
}

impl RawTransactionStore for InMemoryRawTransactionStore {
    fn retrieve_by_hash(&self, hash: &MessageHash) -> Result<Option<RawTransaction>, StoreError> {
        Ok(self.rows.read().get(hash).cloned())
    }

    fn save(&self, transaction: RawTransaction) -> Result<(), StoreError> {
        self.rows.write().insert(transaction.hash.clone(), transaction);
        Ok(())
    }

    fn transaction_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.read().len() as u64)
    }

    fn retrieve_transactions(
        &self,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<RawTransaction>, StoreError> {
        Ok(self
            .rows
            .read()
            .values()
            .skip(offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Serializable network view used to seed [`StaticDiscovery`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyInfo {
    /// This node.
    pub current: NodeInfo,
    /// Known remote nodes.
    pub remotes: Vec<NodeInfo>,
}

/// Discovery over a fixed set of nodes, with peer removal.
pub struct StaticDiscovery {
    current: NodeInfo,
    remotes: RwLock<Vec<NodeInfo>>,
}

impl StaticDiscovery {
    /// Create a discovery view.
    pub fn new(current: NodeInfo, remotes: Vec<NodeInfo>) -> Self {
        Self {
            current,
            remotes: RwLock::new(remotes),
        }
    }

    /// Build from a serialized party info.
    pub fn from_party_info(info: PartyInfo) -> Self {
        Self::new(info.current, info.remotes)
    }
}

impl Discovery for StaticDiscovery {
    fn current(&self) -> NodeInfo {
        self.current.clone()
    }

    fn remote_node_infos(&self) -> Vec<NodeInfo> {
        self.remotes.read().clone()
    }

    fn remote_node_info(&self, key: &PublicKey) -> Result<NodeInfo, DiscoveryError> {
        if self.current.hosts(key) {
            return Ok(self.current.clone());
        }
        self.remotes
            .read()
            .iter()
            .find(|node| node.hosts(key))
            .cloned()
            .ok_or(DiscoveryError::KeyNotFound(*key))
    }

    fn remove_peer(&self, url: &str) {
        let target = normalize_url(url);
        let mut remotes = self.remotes.write();
        let before = remotes.len();
        remotes.retain(|node| normalize_url(&node.url) != target);
        if remotes.len() != before {
            debug!("[discovery] removed peer {}", url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EncodedPayload, Nonce, Recipient, SecurityHash, TxHash};
    use std::collections::BTreeSet;

    fn payload(cipher: &[u8]) -> EncodedPayload {
        EncodedPayload::new(
            PublicKey([1; 32]),
            cipher.to_vec(),
            Nonce::default(),
            Nonce::default(),
        )
    }

    fn staging(cipher: &[u8], affected: &[&[u8]]) -> StagingTransaction {
        let map = affected
            .iter()
            .map(|a| (TxHash::from(&MessageHash::of(a)), SecurityHash::default()))
            .collect();
        StagingTransaction::new(payload(cipher).with_affected_contract_transactions(map))
    }

    #[test]
    fn test_encrypted_store_paging() {
        let store = InMemoryEncryptedTransactionStore::new();
        for i in 0..5u8 {
            store.save(EncryptedTransaction::new(payload(&[i]))).unwrap();
        }
        assert_eq!(store.transaction_count().unwrap(), 5);
        assert_eq!(store.retrieve_transactions(0, 3).unwrap().len(), 3);
        assert_eq!(store.retrieve_transactions(3, 3).unwrap().len(), 2);
        assert!(store.retrieve_transactions(5, 3).unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_row_fails() {
        let store = InMemoryEncryptedTransactionStore::new();
        let result = store.update(EncryptedTransaction::new(payload(b"x")));
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[test]
    fn test_staging_stages_dependencies_first() {
        let store = InMemoryStagingStore::new();
        store.save(staging(b"child", &[b"parent"])).unwrap();
        store.save(staging(b"parent", &[])).unwrap();
        store.save(staging(b"orphan", &[b"not-staged-anywhere"])).unwrap();

        assert_eq!(store.update_stage_for_batch(10, 1).unwrap(), 2);
        assert_eq!(store.update_stage_for_batch(10, 2).unwrap(), 1);
        assert_eq!(store.update_stage_for_batch(10, 3).unwrap(), 0);
        assert_eq!(store.count_staged().unwrap(), 3);

        let ordered = store
            .retrieve_transaction_batch_order_by_stage_and_hash(0, 10)
            .unwrap();
        assert_eq!(ordered.last().unwrap().hash, MessageHash::of(b"child"));
    }

    #[test]
    fn test_staging_respects_batch_size() {
        let store = InMemoryStagingStore::new();
        for i in 0..5u8 {
            store.save(staging(&[i], &[])).unwrap();
        }
        assert_eq!(store.update_stage_for_batch(2, 1).unwrap(), 2);
        assert_eq!(store.update_stage_for_batch(2, 2).unwrap(), 2);
        assert_eq!(store.update_stage_for_batch(2, 3).unwrap(), 1);
        assert_eq!(store.update_stage_for_batch(2, 4).unwrap(), 0);
    }

    #[test]
    fn test_staging_counts_and_delete() {
        let store = InMemoryStagingStore::new();
        store.save(staging(b"a", &[b"b", b"c"])).unwrap();
        store.save(staging(b"a", &[])).unwrap();
        assert_eq!(store.count_all().unwrap(), 2);
        assert_eq!(store.count_all_affected().unwrap(), 2);
        store.delete_all().unwrap();
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_discovery_lookup_and_remove() {
        let key = PublicKey([2; 32]);
        let versions = BTreeSet::new();
        let current = NodeInfo::new("http://me", vec![], versions.clone());
        let remote = NodeInfo::new(
            "http://peer/",
            vec![Recipient::new(key, "http://peer/")],
            versions,
        );
        let discovery = StaticDiscovery::new(current, vec![remote]);

        assert_eq!(discovery.remote_node_info(&key).unwrap().url, "http://peer/");
        discovery.remove_peer("http://peer");
        assert!(discovery.remote_node_infos().is_empty());
        assert!(discovery.remote_node_info(&key).is_err());
    }
}
