//! # Relay Integration Tests
//!
//! Two relay nodes wired through an in-process network: every peer call is
//! routed straight into the other node's resend managers.
//!
//! ```text
//! node A ──make_batch_resend_request──→ node B
//!   ↑                                     │
//!   └──────────────push_batch─────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use node_runtime::adapters::{OfflinePeerClient, SnapshotStores, Transports};
use node_runtime::{
    run_migration, run_recovery, run_resend, RelayConfig, RelayContainer, ResendCommand,
    ResendOutcome,
};
use parking_lot::RwLock;
use pr_02_resend::{
    BatchResendManager, BatchResendManagerImpl, LegacyResendManager, LegacyResendManagerImpl,
    PushBatchRequest, RecoveryClient, ResendBatchRequest, ResendBatchResponse, ResendError,
    ResendRequest, ResendResponse,
};
use shared_types::testing::{sample_key, sample_payload_for, FakeEnclave};
use shared_types::{
    EncryptedTransaction, EncryptedTransactionStore, InMemoryEncryptedTransactionStore, NodeInfo,
    PrivacyMode, PublicKey, PublishError, Recipient, StagingTransaction, StagingTransactionStore,
    StaticDiscovery, API_VERSION_1, API_VERSION_2,
};

const URL_A: &str = "http://node-a:9001";
const URL_B: &str = "http://node-b:9001";

fn key_a() -> PublicKey {
    sample_key(0xA)
}

fn key_b() -> PublicKey {
    sample_key(0xB)
}

// =============================================================================
// LOOPBACK NETWORK
// =============================================================================

#[derive(Default)]
struct LoopbackNetwork {
    batch: RwLock<HashMap<String, Arc<BatchResendManagerImpl>>>,
    legacy: RwLock<HashMap<String, Arc<LegacyResendManagerImpl>>>,
}

impl LoopbackNetwork {
    fn join(&self, container: &RelayContainer) {
        let url = container.config.node.url.clone();
        self.batch
            .write()
            .insert(url.clone(), container.batch_resend_manager.clone());
        self.legacy
            .write()
            .insert(url, container.legacy_resend_manager.clone());
    }

    fn batch_node(&self, url: &str) -> Result<Arc<BatchResendManagerImpl>, PublishError> {
        self.batch.read().get(url).cloned().ok_or_else(|| offline(url))
    }

    fn legacy_node(&self, url: &str) -> Result<Arc<LegacyResendManagerImpl>, PublishError> {
        self.legacy.read().get(url).cloned().ok_or_else(|| offline(url))
    }
}

fn offline(url: &str) -> PublishError {
    PublishError::NodeOffline {
        url: url.to_string(),
    }
}

fn rejected(url: &str, err: ResendError) -> PublishError {
    PublishError::Rejected {
        url: url.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl RecoveryClient for LoopbackNetwork {
    async fn make_batch_resend_request(
        &self,
        url: &str,
        request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, PublishError> {
        let node = self.batch_node(url)?;
        node.resend_batch(request).await.map_err(|e| rejected(url, e))
    }

    async fn make_resend_request(
        &self,
        url: &str,
        request: ResendRequest,
    ) -> Result<ResendResponse, PublishError> {
        let node = self.legacy_node(url)?;
        node.resend(request).await.map_err(|e| rejected(url, e))
    }

    async fn push_batch(&self, url: &str, request: PushBatchRequest) -> Result<(), PublishError> {
        let node = self.batch_node(url)?;
        node.store_resend_batch(request)
            .await
            .map_err(|e| rejected(url, e))
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

fn node_info(url: &str, key: PublicKey) -> NodeInfo {
    let versions: BTreeSet<String> = [API_VERSION_1, API_VERSION_2]
        .into_iter()
        .map(String::from)
        .collect();
    NodeInfo::new(url, vec![Recipient::new(key, url)], versions)
}

fn node(
    network: &Arc<LoopbackNetwork>,
    (url, key): (&str, PublicKey),
    (peer_url, peer_key): (&str, PublicKey),
) -> RelayContainer {
    let mut config = RelayConfig::for_testing(std::env::temp_dir().join("relay-it"));
    config.node.url = url.to_string();

    let discovery = Arc::new(StaticDiscovery::new(
        node_info(url, key),
        vec![node_info(peer_url, peer_key)],
    ));
    let transports = Transports {
        peers: network.clone(),
        payload_publisher: Arc::new(OfflinePeerClient),
        enclave: Arc::new(FakeEnclave::new(vec![key])),
    };

    let container =
        RelayContainer::with_parts(config, SnapshotStores::empty(), discovery, transports);
    network.join(&container);
    container
}

fn network_of_two() -> (RelayContainer, RelayContainer) {
    let network = Arc::new(LoopbackNetwork::default());
    let a = node(&network, (URL_A, key_a()), (URL_B, key_b()));
    let b = node(&network, (URL_B, key_b()), (URL_A, key_a()));
    (a, b)
}

// =============================================================================
// RECOVERY
// =============================================================================

#[tokio::test]
async fn test_recovery_pulls_transactions_from_peer() {
    let (a, b) = network_of_two();
    let payload = sample_payload_for(
        key_b(),
        b"b-to-a",
        &[key_b(), key_a()],
        PrivacyMode::StandardPrivate,
    );
    b.stores
        .encrypted
        .save(EncryptedTransaction::new(payload.clone()))
        .unwrap();

    assert_eq!(run_recovery(&a).await, 0);

    let recovered = a
        .stores
        .encrypted
        .retrieve_by_hash(&payload.hash())
        .unwrap()
        .expect("transaction recovered");
    assert_eq!(recovered.payload.recipient_keys, vec![key_a()]);
    assert_eq!(recovered.payload.recipient_boxes, vec![FakeEnclave::box_for(&key_a())]);
    assert_eq!(a.stores.staging.count_all().unwrap(), 0);
}

#[tokio::test]
async fn test_recovery_restores_own_sent_transaction() {
    let (a, b) = network_of_two();
    // B only holds its own view of a transaction A sent.
    let payload = sample_payload_for(key_a(), b"a-to-b", &[key_b()], PrivacyMode::StandardPrivate);
    b.stores
        .encrypted
        .save(EncryptedTransaction::new(payload.clone()))
        .unwrap();

    assert_eq!(run_recovery(&a).await, 0);

    let restored = a
        .stores
        .encrypted
        .retrieve_by_hash(&payload.hash())
        .unwrap()
        .expect("own transaction restored");
    assert_eq!(restored.payload.recipient_keys, vec![key_b(), key_a()]);
    assert_eq!(restored.payload.recipient_boxes.len(), 2);
}

#[tokio::test]
async fn test_recovery_refuses_dirty_staging_area() {
    let (a, _b) = network_of_two();
    let leftover = sample_payload_for(key_b(), b"old", &[key_a()], PrivacyMode::StandardPrivate);
    a.stores
        .staging
        .save(StagingTransaction::new(leftover))
        .unwrap();

    assert_eq!(run_recovery(&a).await, 2);
    assert_eq!(a.stores.staging.count_all().unwrap(), 1);
}

#[tokio::test]
async fn test_recovery_fails_when_every_peer_is_unreachable() {
    let config = RelayConfig::for_testing(std::env::temp_dir().join("relay-it-offline"));
    let discovery = Arc::new(StaticDiscovery::new(
        node_info(URL_A, key_a()),
        vec![node_info(URL_B, key_b())],
    ));
    let container = RelayContainer::with_parts(
        config,
        SnapshotStores::empty(),
        discovery,
        Transports::offline(),
    );

    assert_eq!(run_recovery(&container).await, 2);
}

// =============================================================================
// RESEND
// =============================================================================

#[tokio::test]
async fn test_individual_resend_returns_recipient_view() {
    let (_a, b) = network_of_two();
    let payload = sample_payload_for(
        key_b(),
        b"single",
        &[key_b(), key_a()],
        PrivacyMode::StandardPrivate,
    );
    b.stores
        .encrypted
        .save(EncryptedTransaction::new(payload.clone()))
        .unwrap();

    let outcome = run_resend(
        &b,
        ResendCommand::Individual {
            key: key_a(),
            hash: payload.hash(),
        },
    )
    .await
    .unwrap();

    let ResendOutcome::Payload(view) = outcome else {
        panic!("expected a payload, got {outcome:?}");
    };
    assert_eq!(view.recipient_keys, vec![key_a()]);
    assert_eq!(view.cipher_text, payload.cipher_text);
}

#[tokio::test]
async fn test_batch_resend_pushes_to_peer_staging() {
    let (a, b) = network_of_two();
    for cipher in [b"one".as_slice(), b"two".as_slice()] {
        let payload =
            sample_payload_for(key_b(), cipher, &[key_b(), key_a()], PrivacyMode::StandardPrivate);
        b.stores
            .encrypted
            .save(EncryptedTransaction::new(payload))
            .unwrap();
    }

    let outcome = run_resend(
        &b,
        ResendCommand::Batch {
            key: key_a(),
            batch_size: Some(1),
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, ResendOutcome::Published(2));
    assert_eq!(a.stores.staging.count_all().unwrap(), 2);
}

// =============================================================================
// MIGRATION
// =============================================================================

#[test]
fn test_migration_merges_snapshot_files() {
    let dir = tempfile::tempdir().unwrap();
    let shared = b"shared".as_slice();

    let primary = SnapshotStores {
        encrypted: Arc::new(InMemoryEncryptedTransactionStore::with_transactions([
            EncryptedTransaction::new(sample_payload_for(
                key_a(),
                shared,
                &[key_b()],
                PrivacyMode::StandardPrivate,
            )),
        ])),
        ..SnapshotStores::empty()
    };
    let config = RelayConfig::for_testing(dir.path());
    primary.save(&config.storage.snapshot_path()).unwrap();

    let secondary_path = dir.path().join("secondary.json");
    let secondary = SnapshotStores {
        encrypted: Arc::new(InMemoryEncryptedTransactionStore::with_transactions([
            EncryptedTransaction::new(sample_payload_for(
                key_a(),
                shared,
                &[sample_key(0xC)],
                PrivacyMode::StandardPrivate,
            )),
            EncryptedTransaction::new(sample_payload_for(
                key_a(),
                b"only-secondary",
                &[key_b()],
                PrivacyMode::StandardPrivate,
            )),
        ])),
        ..SnapshotStores::empty()
    };
    secondary.save(&secondary_path).unwrap();

    let container = RelayContainer::new(config).unwrap();
    let summary = run_migration(&container, &secondary_path).unwrap();
    container.persist().unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.merged, 1);

    let reloaded = SnapshotStores::load(&container.config.storage.snapshot_path()).unwrap();
    assert_eq!(reloaded.encrypted.transaction_count().unwrap(), 2);
}
