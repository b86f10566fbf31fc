//! # Relay Container
//!
//! Builds every subsystem service exactly once and holds them for the
//! lifetime of a command.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Stores (snapshot), Discovery (party info)
//! Level 1: Transports (enclave, peer client) per TransportKind
//! Level 2: pr-02 ResendManager, BatchResendManager, LegacyResendManager
//! Level 3: pr-03 RecoveryService (requester + merging payload store)
//! ```
//!
//! pr-01 DatasetMerger is built on demand, since it needs a second dataset.

use std::collections::BTreeSet;
use std::sync::Arc;

use pr_01_payload_merge::{DatasetMerger, MigrationError};
use pr_02_resend::{
    AsyncBatchPayloadPublisher, BatchResendManagerImpl, ClientResendBatchPublisher,
    LegacyResendManagerImpl, ResendManager, ResendManagerImpl,
};
use pr_03_recovery::{BatchTransactionRequesterImpl, MergingPayloadStore, RecoveryService};
use shared_types::{
    Discovery, EncryptedTransactionStore, NodeInfo, StaticDiscovery, API_VERSION_1, API_VERSION_2,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::adapters::{
    build_transports, load_party_info, MeteredBatchPublisher, MeteredPayloadPublisher,
    SnapshotError, SnapshotStores, TransportError, Transports,
};
use crate::container::config::RelayConfig;

/// Container construction errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Stores or party info could not be loaded.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Transports could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Central container holding every subsystem instance.
pub struct RelayContainer {
    /// Node configuration (immutable after initialization).
    pub config: RelayConfig,

    // =========================================================================
    // LEVEL 0-1: Infrastructure
    // =========================================================================
    /// Local stores.
    pub stores: SnapshotStores,
    /// Network view.
    pub discovery: Arc<StaticDiscovery>,
    /// Remote collaborators.
    pub transports: Transports,

    // =========================================================================
    // LEVEL 2: Resend (pr-02)
    // =========================================================================
    /// Own-message acceptance.
    pub resend_manager: Arc<ResendManagerImpl>,
    /// Batch resend and staging.
    pub batch_resend_manager: Arc<BatchResendManagerImpl>,
    /// Resend for peers without batch support.
    pub legacy_resend_manager: Arc<LegacyResendManagerImpl>,

    // =========================================================================
    // LEVEL 3: Recovery (pr-03)
    // =========================================================================
    /// Recovery orchestrator.
    pub recovery: Arc<RecoveryService>,
}

impl RelayContainer {
    /// Load stores and party info from disk and build transports from config.
    #[instrument(name = "relay_init", skip(config))]
    pub fn new(config: RelayConfig) -> Result<Self, ContainerError> {
        info!("Initializing Private-Relay container");

        let stores = SnapshotStores::load(&config.storage.snapshot_path())?;
        let discovery = Arc::new(build_discovery(&config)?);
        let transports = build_transports(&config, discovery.clone())?;

        Ok(Self::with_parts(config, stores, discovery, transports))
    }

    /// Wire subsystems against already built infrastructure.
    pub fn with_parts(
        config: RelayConfig,
        stores: SnapshotStores,
        discovery: Arc<StaticDiscovery>,
        transports: Transports,
    ) -> Self {
        let enclave = transports.enclave.clone();
        let discovery_port: Arc<dyn Discovery> = discovery.clone();
        let encrypted: Arc<dyn EncryptedTransactionStore> = stores.encrypted.clone();

        // Level 2: resend
        let resend_manager = Arc::new(ResendManagerImpl::new(enclave.clone(), encrypted.clone()));
        let batch_publisher = Arc::new(MeteredBatchPublisher::new(Arc::new(
            ClientResendBatchPublisher::new(transports.peers.clone()),
        )));
        let batch_resend_manager = Arc::new(BatchResendManagerImpl::new(
            config.resend.clone(),
            enclave.clone(),
            discovery_port.clone(),
            encrypted.clone(),
            stores.staging.clone(),
            batch_publisher,
        ));
        let fan_out = Arc::new(AsyncBatchPayloadPublisher::new(
            Arc::new(MeteredPayloadPublisher::new(transports.payload_publisher.clone())),
            config.resend.publish_concurrency,
        ));
        let legacy_resend_manager = Arc::new(LegacyResendManagerImpl::new(
            config.resend.clone(),
            enclave.clone(),
            discovery_port.clone(),
            encrypted.clone(),
            fan_out,
        ));
        info!("  [02] Resend managers initialized");

        // Level 3: recovery
        let requester = Arc::new(BatchTransactionRequesterImpl::new(
            enclave.clone(),
            transports.peers.clone(),
            config.recovery.resend_batch_size,
            config.recovery.max_attempts,
        ));
        let own_messages: Arc<dyn ResendManager> = resend_manager.clone();
        let payload_store = Arc::new(MergingPayloadStore::new(enclave, encrypted, own_messages));
        let recovery = Arc::new(RecoveryService::new(
            config.recovery.clone(),
            discovery_port,
            stores.staging.clone(),
            requester,
            payload_store,
        ));
        info!("  [03] Recovery service initialized");

        Self {
            config,
            stores,
            discovery,
            transports,
            resend_manager,
            batch_resend_manager,
            legacy_resend_manager,
            recovery,
        }
    }

    /// Merger folding `secondary` into this node's canonical store.
    pub fn dataset_merger(
        &self,
        secondary: Arc<dyn EncryptedTransactionStore>,
    ) -> Result<DatasetMerger, MigrationError> {
        DatasetMerger::new(
            self.config.migration.clone(),
            self.stores.encrypted.clone(),
            secondary,
        )
    }

    /// Write the stores back to the configured snapshot file.
    pub fn persist(&self) -> Result<(), SnapshotError> {
        self.stores.save(&self.config.storage.snapshot_path())
    }
}

/// Network view from the party info file, or a lone node at `node.url`.
pub fn build_discovery(config: &RelayConfig) -> Result<StaticDiscovery, SnapshotError> {
    match &config.node.party_info {
        Some(path) => {
            let party_info = load_party_info(path)?;
            info!(
                "Loaded party info {}: {} remote nodes",
                path.display(),
                party_info.remotes.len()
            );
            Ok(StaticDiscovery::from_party_info(party_info))
        }
        None => {
            let versions: BTreeSet<String> = [API_VERSION_1, API_VERSION_2]
                .into_iter()
                .map(String::from)
                .collect();
            let current = NodeInfo::new(config.node.url.clone(), Vec::new(), versions);
            Ok(StaticDiscovery::new(current, Vec::new()))
        }
    }
}
