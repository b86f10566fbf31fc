//! # Recovery Handler
//!
//! Runs the three recovery phases and maps the result onto a process exit
//! code.

use pr_03_recovery::{Recovery, RecoveryReport, RecoveryResult};
use relay_telemetry::{
    metric_inc, metric_observe, PEERS_KNOWN, RECOVERY_PHASES, RECOVERY_PHASE_DURATION,
    STAGED_ROWS, SUBSYSTEM_ERRORS,
};
use shared_types::{Discovery, StagingTransactionStore};
use tracing::{error, info, instrument, warn};

use crate::container::RelayContainer;

fn outcome_label(result: RecoveryResult) -> &'static str {
    match result {
        RecoveryResult::Success => "success",
        RecoveryResult::PartialSuccess => "partial",
        RecoveryResult::Failure => "failure",
    }
}

/// Record per-phase outcomes and durations.
pub fn record_report(report: &RecoveryReport) {
    let phases = [
        ("request", report.request, report.request_duration),
        ("stage", report.stage, report.stage_duration),
        ("sync", report.sync, report.sync_duration),
    ];
    for (phase, result, duration) in phases {
        metric_inc!(RECOVERY_PHASES, &[phase, outcome_label(result)]);
        metric_observe!(RECOVERY_PHASE_DURATION, &[phase], duration.as_secs_f64());
    }
}

/// Run a full recovery and return the exit code.
///
/// `0` on success, `1` on partial success, `2` on failure or when the
/// staging area was not empty to begin with.
#[instrument(name = "recover", skip(container))]
pub async fn run_recovery(container: &RelayContainer) -> i32 {
    let peers = container.discovery.remote_node_infos().len();
    PEERS_KNOWN.set(peers as f64);
    info!("[pr-03] starting recovery against {} remote nodes", peers);

    let code = match container.recovery.run().await {
        Ok(report) => {
            record_report(&report);
            let outcome = report.outcome();
            match outcome {
                RecoveryResult::Success => info!("[pr-03] recovery complete: {}", report),
                RecoveryResult::PartialSuccess => {
                    warn!("[pr-03] recovery partially complete: {}", report)
                }
                RecoveryResult::Failure => error!("[pr-03] recovery failed: {}", report),
            }
            outcome.code()
        }
        Err(err) => {
            metric_inc!(SUBSYSTEM_ERRORS, &["recovery", "precheck"]);
            error!("[pr-03] {}", err);
            RecoveryResult::Failure.code()
        }
    };

    match container.stores.staging.count_all() {
        Ok(staged) => STAGED_ROWS.set(staged as f64),
        Err(err) => warn!("[pr-03] cannot count staging rows: {}", err),
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RelayConfig;
    use std::time::Duration;

    #[test]
    fn test_record_report_counts_each_phase() {
        let before = RECOVERY_PHASES
            .with_label_values(&["sync", "partial"])
            .get();
        let report = RecoveryReport {
            request: RecoveryResult::Success,
            stage: RecoveryResult::Success,
            sync: RecoveryResult::PartialSuccess,
            request_duration: Duration::from_millis(5),
            stage_duration: Duration::from_millis(2),
            sync_duration: Duration::from_millis(9),
        };

        record_report(&report);

        let after = RECOVERY_PHASES
            .with_label_values(&["sync", "partial"])
            .get();
        assert!(after >= before + 1.0);
    }

    #[tokio::test]
    async fn test_lone_node_recovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let container = RelayContainer::new(RelayConfig::for_testing(dir.path())).unwrap();

        assert_eq!(run_recovery(&container).await, 0);
    }
}
