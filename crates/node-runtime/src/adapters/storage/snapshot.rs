//! JSON snapshot persistence for the in-memory stores.
//!
//! The whole dataset lives in one file. Writes go to a sibling temporary
//! file that is renamed over the original, so a crash mid-write leaves the
//! previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared_types::{
    EncryptedTransaction, InMemoryEncryptedTransactionStore, InMemoryRawTransactionStore,
    InMemoryStagingStore, PartyInfo, RawTransaction, StagingTransaction, StagingTransactionStore,
    StoreError,
};
use thiserror::Error;
use tracing::{debug, info};

/// Snapshot errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Reading or writing the file failed.
    #[error("Snapshot I/O error on {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("Malformed snapshot {}: {source}", .path.display())]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Populating a store failed.
    #[error("Cannot restore snapshot rows: {0}")]
    Store(#[from] StoreError),
}

/// Serialized form of every store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    /// Canonical transactions.
    pub encrypted: Vec<EncryptedTransaction>,
    /// Recovery staging rows.
    pub staging: Vec<StagingTransaction>,
    /// Raw transactions.
    pub raw: Vec<RawTransaction>,
}

/// The node's stores, restorable from and savable to a snapshot file.
#[derive(Clone, Default)]
pub struct SnapshotStores {
    /// Canonical transaction store.
    pub encrypted: Arc<InMemoryEncryptedTransactionStore>,
    /// Recovery staging store.
    pub staging: Arc<InMemoryStagingStore>,
    /// Raw transaction store.
    pub raw: Arc<InMemoryRawTransactionStore>,
}

impl SnapshotStores {
    /// Empty stores.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Populate stores from a snapshot value.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, SnapshotError> {
        let staging = InMemoryStagingStore::new();
        for row in snapshot.staging {
            staging.save(row)?;
        }
        Ok(Self {
            encrypted: Arc::new(InMemoryEncryptedTransactionStore::with_transactions(
                snapshot.encrypted,
            )),
            staging: Arc::new(staging),
            raw: Arc::new(InMemoryRawTransactionStore::with_transactions(snapshot.raw)),
        })
    }

    /// Load the snapshot at `path`. A missing file yields empty stores.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        if !path.exists() {
            info!("No snapshot at {}, starting with empty stores", path.display());
            return Ok(Self::empty());
        }
        let snapshot: StoreSnapshot = read_json(path)?;
        info!(
            "Loaded snapshot {}: {} transactions, {} staged, {} raw",
            path.display(),
            snapshot.encrypted.len(),
            snapshot.staging.len(),
            snapshot.raw.len()
        );
        Self::from_snapshot(snapshot)
    }

    /// Current contents of every store.
    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            encrypted: self.encrypted.snapshot(),
            staging: self.staging.snapshot(),
            raw: self.raw.snapshot(),
        }
    }

    /// Write every store to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let io_err = |source: std::io::Error| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let snapshot = self.to_snapshot();
        let body = serde_json::to_vec_pretty(&snapshot).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        debug!("Saved snapshot {}", path.display());
        Ok(())
    }
}

/// Read a party info file.
pub fn load_party_info(path: &Path) -> Result<PartyInfo, SnapshotError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SnapshotError> {
    let body = std::fs::read(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })
}
