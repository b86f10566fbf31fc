//! # Recovery Service
//!
//! Drives the request, stage and sync phases.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use shared_types::{Discovery, PrivacyMode, StagingTransactionStore};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::algorithms::{aggregate, group_by_hash};
use crate::config::RecoveryConfig;
use crate::domain::{RecoveryError, RecoveryReport, RecoveryResult};
use crate::ports::{BatchTransactionRequester, PayloadStore, Recovery};

/// Recovery Service - orchestrates the three recovery phases.
pub struct RecoveryService {
    config: RecoveryConfig,
    discovery: Arc<dyn Discovery>,
    staging_store: Arc<dyn StagingTransactionStore>,
    requester: Arc<dyn BatchTransactionRequester>,
    payload_store: Arc<dyn PayloadStore>,
}

impl RecoveryService {
    /// Create a recovery service.
    pub fn new(
        config: RecoveryConfig,
        discovery: Arc<dyn Discovery>,
        staging_store: Arc<dyn StagingTransactionStore>,
        requester: Arc<dyn BatchTransactionRequester>,
        payload_store: Arc<dyn PayloadStore>,
    ) -> Self {
        Self {
            config,
            discovery,
            staging_store,
            requester,
            payload_store,
        }
    }

    fn precheck(&self) -> Result<(), RecoveryError> {
        let rows = self
            .staging_store
            .count_all()
            .map_err(|err| RecoveryError::Precheck(format!("cannot query staging rows: {}", err)))?;
        let affected = self.staging_store.count_all_affected().map_err(|err| {
            RecoveryError::Precheck(format!("cannot query staging affected transactions: {}", err))
        })?;

        if rows != 0 || affected != 0 {
            return Err(RecoveryError::Precheck(format!(
                "staging area holds {} rows and {} affected links",
                rows, affected
            )));
        }
        Ok(())
    }

    /// Store staged rows page by page. Returns (submitted, failed), or `None`
    /// when a failure makes further submissions pointless.
    async fn sync_rows(&self) -> Option<(u64, u64)> {
        let batch_size = self.config.batch_size.max(1);
        let mut submitted = 0u64;
        let mut failed = 0u64;
        let mut offset = 0u64;

        loop {
            let total = match self.staging_store.count_all() {
                Ok(total) => total,
                Err(err) => {
                    error!("[pr-03] cannot count staging rows: {}", err);
                    return None;
                }
            };
            if offset >= total {
                break;
            }

            let rows = match self
                .staging_store
                .retrieve_transaction_batch_order_by_stage_and_hash(offset, batch_size)
            {
                Ok(rows) => rows,
                Err(err) => {
                    error!("[pr-03] cannot read staging rows at offset {}: {}", offset, err);
                    return None;
                }
            };

            for group in group_by_hash(rows) {
                for row in group {
                    let is_psv = row.privacy_mode() == PrivacyMode::PrivateStateValidation;
                    submitted += 1;
                    if let Err(err) = self.payload_store.store_payload(row.payload).await {
                        if !err.is_recoverable() {
                            error!("[pr-03] sync aborted at {}: {}", row.hash, err);
                            return None;
                        }
                        warn!("[pr-03] failed to store {}: {}", row.hash, err);
                        failed += 1;
                    }
                    // One PSV version carries every box.
                    if is_psv {
                        break;
                    }
                }
            }

            offset += batch_size as u64;
        }

        Some((submitted, failed))
    }
}

#[async_trait]
impl Recovery for RecoveryService {
    async fn request(&self) -> RecoveryResult {
        let peers = self.discovery.remote_node_infos();
        let permits = Arc::new(Semaphore::new(self.config.request_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for peer in peers.iter().cloned() {
            let requester = self.requester.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (peer.url, false);
                };
                let succeeded = if peer.supports_batch_recovery() {
                    requester.request_all_transactions_from_node(&peer.url).await
                } else {
                    requester
                        .request_all_transactions_from_legacy_node(&peer.url)
                        .await
                };
                (peer.url, succeeded)
            });
        }

        let mut failures = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, true)) => {}
                Ok((url, false)) => {
                    warn!("[pr-03] resend request to {} failed", url);
                    failures += 1;
                }
                Err(err) => {
                    warn!("[pr-03] resend request task failed: {}", err);
                    failures += 1;
                }
            }
        }

        let result = aggregate(failures, peers.len() as u64);
        info!(
            "[pr-03] request phase: {} ({} of {} peers failed)",
            result,
            failures,
            peers.len()
        );
        result
    }

    async fn stage(&self) -> RecoveryResult {
        let batch_size = self.config.batch_size.max(1);
        let mut stage = 0u64;
        loop {
            stage += 1;
            match self.staging_store.update_stage_for_batch(batch_size, stage) {
                Ok(0) => break,
                Ok(count) => debug!("[pr-03] stage {}: {} rows", stage, count),
                Err(err) => {
                    error!("[pr-03] staging failed at stage {}: {}", stage, err);
                    return RecoveryResult::Failure;
                }
            }
        }

        let counts = self
            .staging_store
            .count_all()
            .and_then(|total| Ok((total, self.staging_store.count_staged()?)));
        let (total, staged) = match counts {
            Ok(counts) => counts,
            Err(err) => {
                error!("[pr-03] cannot count staged rows: {}", err);
                return RecoveryResult::Failure;
            }
        };

        let result = aggregate(total.saturating_sub(staged), total);
        info!("[pr-03] stage phase: {} ({} of {} rows staged)", result, staged, total);
        result
    }

    async fn sync(&self) -> RecoveryResult {
        let Some((submitted, failed)) = self.sync_rows().await else {
            return RecoveryResult::Failure;
        };

        let result = aggregate(failed, submitted);
        if failed > 0 {
            warn!(
                "[pr-03] {} of {} payloads could not be stored and were skipped",
                failed, submitted
            );
        }

        if result == RecoveryResult::Success {
            if let Err(err) = self.staging_store.delete_all() {
                warn!("[pr-03] could not clear staging area: {}", err);
                return RecoveryResult::PartialSuccess;
            }
        }

        info!("[pr-03] sync phase: {} ({} payloads)", result, submitted);
        result
    }

    async fn run(&self) -> Result<RecoveryReport, RecoveryError> {
        self.precheck().inspect_err(|err| error!("[pr-03] {}", err))?;

        let started = Instant::now();
        debug!("[pr-03] requesting transactions from peers");
        let request = self.request().await;
        let request_duration = started.elapsed();

        let started = Instant::now();
        debug!("[pr-03] staging transactions");
        let stage = self.stage().await;
        let stage_duration = started.elapsed();

        let started = Instant::now();
        debug!("[pr-03] synchronising transactions");
        let sync = self.sync().await;
        let sync_duration = started.elapsed();

        let report = RecoveryReport {
            request,
            stage,
            sync,
            request_duration,
            stage_duration,
            sync_duration,
        };
        info!(
            "[pr-03] recovery finished in {} ms: {}",
            report.total_duration().as_millis(),
            report
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StorePayloadError;
    use crate::ports::{MockPayloadStore, MockTransactionRequester};
    use shared_types::testing::{sample_key, sample_payload, sample_payload_for};
    use shared_types::{
        EncodedPayload, EnclaveError, InMemoryStagingStore, NodeInfo, SecurityHash,
        StagingTransaction, StaticDiscovery, TxHash, API_VERSION_2,
    };
    use std::collections::{BTreeMap, BTreeSet};

    struct Fixture {
        staging: Arc<InMemoryStagingStore>,
        requester: Arc<MockTransactionRequester>,
        payload_store: Arc<MockPayloadStore>,
        service: RecoveryService,
    }

    fn peer(url: &str, batch: bool) -> NodeInfo {
        let versions: BTreeSet<String> = if batch {
            [API_VERSION_2.to_string()].into_iter().collect()
        } else {
            BTreeSet::new()
        };
        NodeInfo::new(url, vec![], versions)
    }

    fn fixture_with(
        peers: Vec<NodeInfo>,
        requester: MockTransactionRequester,
        payload_store: MockPayloadStore,
    ) -> Fixture {
        let discovery = Arc::new(StaticDiscovery::new(
            NodeInfo::new("http://me", vec![], BTreeSet::new()),
            peers,
        ));
        let staging = Arc::new(InMemoryStagingStore::new());
        let requester = Arc::new(requester);
        let payload_store = Arc::new(payload_store);
        let service = RecoveryService::new(
            RecoveryConfig::for_testing(),
            discovery,
            staging.clone(),
            requester.clone(),
            payload_store.clone(),
        );
        Fixture {
            staging,
            requester,
            payload_store,
            service,
        }
    }

    fn fixture(peers: Vec<NodeInfo>) -> Fixture {
        fixture_with(peers, MockTransactionRequester::new(), MockPayloadStore::new())
    }

    fn stage_row(staging: &InMemoryStagingStore, payload: EncodedPayload) {
        staging.save(StagingTransaction::new(payload)).unwrap();
    }

    fn affecting(payload: EncodedPayload, other: &EncodedPayload) -> EncodedPayload {
        let mut map = BTreeMap::new();
        map.insert(TxHash::from(&other.hash()), SecurityHash::default());
        payload.with_affected_contract_transactions(map)
    }

    #[tokio::test]
    async fn test_request_no_peers_is_success() {
        let f = fixture(vec![]);
        assert_eq!(f.service.request().await, RecoveryResult::Success);
    }

    #[tokio::test]
    async fn test_request_routes_by_api_version() {
        let f = fixture(vec![peer("http://new", true), peer("http://old", false)]);

        assert_eq!(f.service.request().await, RecoveryResult::Success);

        let mut requests = f.requester.requests.lock().clone();
        requests.sort();
        assert_eq!(
            requests,
            vec![("http://new".to_string(), false), ("http://old".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_request_partial_and_failure() {
        let f = fixture_with(
            vec![peer("http://a", true), peer("http://b", true)],
            MockTransactionRequester::new().fail_for("http://a"),
            MockPayloadStore::new(),
        );
        assert_eq!(f.service.request().await, RecoveryResult::PartialSuccess);

        let f = fixture_with(
            vec![peer("http://a", true), peer("http://b", false)],
            MockTransactionRequester::new()
                .fail_for("http://a")
                .fail_for("http://b"),
            MockPayloadStore::new(),
        );
        assert_eq!(f.service.request().await, RecoveryResult::Failure);
    }

    #[tokio::test]
    async fn test_stage_empty_is_success() {
        let f = fixture(vec![]);
        assert_eq!(f.service.stage().await, RecoveryResult::Success);
    }

    #[tokio::test]
    async fn test_stage_orders_dependencies() {
        let f = fixture(vec![]);
        let base = sample_payload(sample_key(1), b"base");
        let child = affecting(sample_payload(sample_key(1), b"child"), &base);
        stage_row(&f.staging, child.clone());
        stage_row(&f.staging, base.clone());

        assert_eq!(f.service.stage().await, RecoveryResult::Success);

        let rows = f.staging.snapshot();
        let stage_of = |p: &EncodedPayload| {
            rows.iter()
                .find(|r| r.hash == p.hash())
                .and_then(|r| r.stage)
        };
        assert!(stage_of(&base) < stage_of(&child));
    }

    #[tokio::test]
    async fn test_stage_cycle_partial_and_failure() {
        let f = fixture(vec![]);
        let a = sample_payload(sample_key(1), b"a");
        let b = sample_payload(sample_key(1), b"b");
        stage_row(&f.staging, affecting(a.clone(), &b));
        stage_row(&f.staging, affecting(b.clone(), &a));

        assert_eq!(f.service.stage().await, RecoveryResult::Failure);

        stage_row(&f.staging, sample_payload(sample_key(1), b"free"));
        assert_eq!(f.service.stage().await, RecoveryResult::PartialSuccess);
    }

    #[tokio::test]
    async fn test_sync_skips_psv_duplicates() {
        let f = fixture(vec![]);
        let psv = sample_payload_for(
            sample_key(1),
            b"psv",
            &[sample_key(2)],
            PrivacyMode::PrivateStateValidation,
        );
        stage_row(&f.staging, psv.clone());
        stage_row(&f.staging, psv);
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::Success);
        assert_eq!(f.payload_store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_submits_every_standard_version() {
        let f = fixture(vec![]);
        let sender = sample_key(1);
        for recipient in [sample_key(2), sample_key(3)] {
            stage_row(
                &f.staging,
                sample_payload_for(sender, b"sp", &[recipient], PrivacyMode::StandardPrivate),
            );
        }
        stage_row(&f.staging, sample_payload(sender, b"other"));
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::Success);
        assert_eq!(f.payload_store.call_count(), 3);
        assert_eq!(f.staging.count_all().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_counts_failures() {
        let bad = sample_payload(sample_key(1), b"bad");
        let f = fixture_with(
            vec![],
            MockTransactionRequester::new(),
            MockPayloadStore::new().fail_for(bad.hash()),
        );
        stage_row(&f.staging, bad.clone());
        stage_row(&f.staging, sample_payload(sample_key(1), b"good"));
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::PartialSuccess);
        assert_eq!(f.staging.count_all().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sync_all_failed_is_failure() {
        let bad = sample_payload(sample_key(1), b"bad");
        let f = fixture_with(
            vec![],
            MockTransactionRequester::new(),
            MockPayloadStore::new().fail_for(bad.hash()),
        );
        stage_row(&f.staging, bad);
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::Failure);
    }

    #[tokio::test]
    async fn test_sync_aborts_on_unrecoverable_error() {
        let f = fixture_with(
            vec![],
            MockTransactionRequester::new(),
            MockPayloadStore::new()
                .failing_with(StorePayloadError::Enclave(EnclaveError::NotAvailable)),
        );
        for n in 0..3u8 {
            stage_row(&f.staging, sample_payload(sample_key(1), &[n]));
        }
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::Failure);
        assert_eq!(f.payload_store.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_pages_through_rows() {
        let f = fixture(vec![]);
        for n in 0..7u8 {
            stage_row(&f.staging, sample_payload(sample_key(1), &[n]));
        }
        f.service.stage().await;

        assert_eq!(f.service.sync().await, RecoveryResult::Success);
        assert_eq!(f.payload_store.call_count(), 7);
    }

    #[tokio::test]
    async fn test_recover_precheck_fails_on_dirty_staging() {
        let f = fixture(vec![peer("http://a", true)]);
        stage_row(&f.staging, sample_payload(sample_key(1), b"leftover"));

        assert_eq!(f.service.recover().await, 2);
        assert!(f.requester.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_recover_success() {
        let f = fixture(vec![peer("http://a", true)]);
        assert_eq!(f.service.recover().await, 0);
    }

    #[tokio::test]
    async fn test_recover_returns_worst_phase() {
        let f = fixture_with(
            vec![peer("http://a", true), peer("http://b", true)],
            MockTransactionRequester::new().fail_for("http://b"),
            MockPayloadStore::new(),
        );

        let report = f.service.run().await.unwrap();
        assert_eq!(report.request, RecoveryResult::PartialSuccess);
        assert_eq!(report.stage, RecoveryResult::Success);
        assert_eq!(report.sync, RecoveryResult::Success);
        assert_eq!(f.service.recover().await, 1);
    }

    #[tokio::test]
    async fn test_recover_fails_when_every_request_fails() {
        let f = fixture_with(
            vec![peer("http://a", true), peer("http://b", false)],
            MockTransactionRequester::new()
                .fail_for("http://a")
                .fail_for("http://b"),
            MockPayloadStore::new(),
        );

        let report = f.service.run().await.unwrap();
        assert_eq!(report.request, RecoveryResult::Failure);
        assert_eq!(report.stage, RecoveryResult::Success);
        assert_eq!(report.sync, RecoveryResult::Success);

        assert_eq!(f.service.recover().await, 2);
        assert_eq!(f.requester.requests.lock().len(), 4);
    }
}
