//! # Dataset Merger
//!
//! Consolidates a secondary dataset into a primary one. Encrypted
//! transactions present in both are merged; raw transactions are copied only
//! when absent.

use std::sync::Arc;

use shared_types::{EncryptedTransactionStore, RawTransactionStore};
use tracing::{debug, info};

use crate::algorithms::{calculate_batch_count, merge};
use crate::config::MergeConfig;
use crate::domain::{MigrationError, MigrationSummary};

/// Walks a secondary dataset page by page and folds it into the primary.
pub struct DatasetMerger {
    config: MergeConfig,
    primary: Arc<dyn EncryptedTransactionStore>,
    secondary: Arc<dyn EncryptedTransactionStore>,
}

impl DatasetMerger {
    /// Create a merger over two encrypted transaction stores.
    pub fn new(
        config: MergeConfig,
        primary: Arc<dyn EncryptedTransactionStore>,
        secondary: Arc<dyn EncryptedTransactionStore>,
    ) -> Result<Self, MigrationError> {
        config.validate()?;
        Ok(Self {
            config,
            primary,
            secondary,
        })
    }

    /// Merge every encrypted transaction of the secondary into the primary.
    ///
    /// Each row is written with its own store call, so an error leaves the
    /// rows processed before it in place.
    pub fn migrate(&self) -> Result<MigrationSummary, MigrationError> {
        let page_size = self.config.page_size;
        let total = self
            .secondary
            .transaction_count()
            .map_err(|source| MigrationError::SecondaryRead { offset: 0, source })?;
        let batches = calculate_batch_count(page_size as u64, total);

        info!(
            "[pr-01] migrating {} encrypted transactions in {} batches",
            total, batches
        );

        let mut summary = MigrationSummary::default();
        for batch in 0..batches {
            let offset = batch * page_size as u64;
            let rows = self
                .secondary
                .retrieve_transactions(offset, page_size)
                .map_err(|source| MigrationError::SecondaryRead { offset, source })?;

            for secondary_tx in rows {
                let existing = self
                    .primary
                    .retrieve_by_hash(&secondary_tx.hash)
                    .map_err(MigrationError::PrimaryRead)?;

                match existing {
                    None => {
                        self.primary
                            .save(secondary_tx)
                            .map_err(MigrationError::PrimaryWrite)?;
                        summary.inserted += 1;
                    }
                    Some(primary_tx) => {
                        let merged = merge(primary_tx.payload.clone(), secondary_tx.payload);
                        debug!("[pr-01] merged transaction {}", primary_tx.hash);
                        self.primary
                            .update(primary_tx.with_payload(merged))
                            .map_err(MigrationError::PrimaryWrite)?;
                        summary.merged += 1;
                    }
                }
            }
        }

        info!("[pr-01] encrypted transaction migration done: {}", summary);
        Ok(summary)
    }

    /// Copy raw transactions absent from the primary. Existing rows are never
    /// revised.
    pub fn migrate_raw(
        &self,
        primary: &dyn RawTransactionStore,
        secondary: &dyn RawTransactionStore,
    ) -> Result<MigrationSummary, MigrationError> {
        let page_size = self.config.page_size;
        let total = secondary
            .transaction_count()
            .map_err(|source| MigrationError::SecondaryRead { offset: 0, source })?;
        let batches = calculate_batch_count(page_size as u64, total);

        info!(
            "[pr-01] migrating {} raw transactions in {} batches",
            total, batches
        );

        let mut summary = MigrationSummary::default();
        for batch in 0..batches {
            let offset = batch * page_size as u64;
            let rows = secondary
                .retrieve_transactions(offset, page_size)
                .map_err(|source| MigrationError::SecondaryRead { offset, source })?;

            for raw in rows {
                let exists = primary
                    .retrieve_by_hash(&raw.hash)
                    .map_err(MigrationError::PrimaryRead)?
                    .is_some();
                if exists {
                    summary.skipped += 1;
                    continue;
                }
                primary.save(raw).map_err(MigrationError::PrimaryWrite)?;
                summary.inserted += 1;
            }
        }

        info!("[pr-01] raw transaction migration done: {}", summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::testing::{sample_key, sample_payload_for};
    use shared_types::{
        EncryptedTransaction, InMemoryEncryptedTransactionStore, InMemoryRawTransactionStore,
        MessageHash, Nonce, PrivacyMode, RawTransaction, StoreError,
    };

    fn tx(cipher: &[u8], recipients: &[u8]) -> EncryptedTransaction {
        let keys: Vec<_> = recipients.iter().map(|n| sample_key(*n)).collect();
        EncryptedTransaction::new(sample_payload_for(
            sample_key(1),
            cipher,
            &keys,
            PrivacyMode::StandardPrivate,
        ))
    }

    fn merger(
        primary: Arc<InMemoryEncryptedTransactionStore>,
        secondary: Arc<InMemoryEncryptedTransactionStore>,
    ) -> DatasetMerger {
        DatasetMerger::new(MergeConfig::for_testing(), primary, secondary).unwrap()
    }

    #[test]
    fn test_inserts_missing_rows_across_pages() {
        let primary = Arc::new(InMemoryEncryptedTransactionStore::new());
        let secondary = Arc::new(InMemoryEncryptedTransactionStore::with_transactions(
            (0..5u8).map(|i| tx(&[i], &[2])),
        ));

        let summary = merger(primary.clone(), secondary).migrate().unwrap();

        assert_eq!(summary.inserted, 5);
        assert_eq!(summary.merged, 0);
        assert_eq!(primary.transaction_count().unwrap(), 5);
    }

    #[test]
    fn test_merges_rows_present_in_both() {
        let primary = Arc::new(InMemoryEncryptedTransactionStore::with_transactions([tx(
            b"shared",
            &[2],
        )]));
        let secondary = Arc::new(InMemoryEncryptedTransactionStore::with_transactions([
            tx(b"shared", &[3]),
            tx(b"only-secondary", &[3]),
        ]));

        let summary = merger(primary.clone(), secondary).migrate().unwrap();

        assert_eq!(summary.merged, 1);
        assert_eq!(summary.inserted, 1);

        let merged = primary
            .retrieve_by_hash(&MessageHash::of(b"shared"))
            .unwrap()
            .unwrap();
        assert_eq!(merged.payload.recipient_keys, vec![sample_key(2), sample_key(3)]);
    }

    #[test]
    fn test_empty_secondary_is_noop() {
        let primary = Arc::new(InMemoryEncryptedTransactionStore::new());
        let secondary = Arc::new(InMemoryEncryptedTransactionStore::new());

        let summary = merger(primary, secondary).migrate().unwrap();
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_raw_insert_if_absent() {
        let raw = |data: &[u8]| {
            RawTransaction::new(data.to_vec(), b"key".to_vec(), Nonce::default(), sample_key(1))
        };
        let primary = InMemoryRawTransactionStore::with_transactions([raw(b"a")]);
        let secondary = InMemoryRawTransactionStore::with_transactions([raw(b"a"), raw(b"b")]);

        let m = merger(
            Arc::new(InMemoryEncryptedTransactionStore::new()),
            Arc::new(InMemoryEncryptedTransactionStore::new()),
        );
        let summary = m.migrate_raw(&primary, &secondary).unwrap();

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(primary.transaction_count().unwrap(), 2);
    }

    struct FailingStore;

    impl EncryptedTransactionStore for FailingStore {
        fn retrieve_by_hash(
            &self,
            _hash: &MessageHash,
        ) -> Result<Option<EncryptedTransaction>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn save(&self, _t: EncryptedTransaction) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn update(&self, _t: EncryptedTransaction) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn transaction_count(&self) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn retrieve_transactions(
            &self,
            _offset: u64,
            _limit: usize,
        ) -> Result<Vec<EncryptedTransaction>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[test]
    fn test_store_error_stops_processing() {
        let primary = Arc::new(InMemoryEncryptedTransactionStore::new());
        let m = DatasetMerger::new(MergeConfig::for_testing(), primary, Arc::new(FailingStore))
            .unwrap();

        assert!(matches!(
            m.migrate(),
            Err(MigrationError::SecondaryRead { offset: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = DatasetMerger::new(
            MergeConfig { page_size: 0 },
            Arc::new(InMemoryEncryptedTransactionStore::new()),
            Arc::new(InMemoryEncryptedTransactionStore::new()),
        );
        assert!(result.is_err());
    }
}
