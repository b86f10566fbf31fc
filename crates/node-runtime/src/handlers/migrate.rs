//! # Migration Handler
//!
//! Folds a second node's snapshot into this node's stores.

use std::path::{Path, PathBuf};

use pr_01_payload_merge::{MigrationError, MigrationSummary};
use relay_telemetry::{metric_inc, MIGRATION_ROWS, SUBSYSTEM_ERRORS};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::adapters::{SnapshotError, SnapshotStores};
use crate::container::RelayContainer;

/// Migration command errors.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The secondary snapshot does not exist.
    #[error("Secondary snapshot {} not found", .0.display())]
    MissingSecondary(PathBuf),

    /// The secondary snapshot could not be read.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The merge itself failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

fn record_summary(summary: &MigrationSummary) {
    MIGRATION_ROWS
        .with_label_values(&["inserted"])
        .inc_by(summary.inserted as f64);
    MIGRATION_ROWS
        .with_label_values(&["merged"])
        .inc_by(summary.merged as f64);
    MIGRATION_ROWS
        .with_label_values(&["skipped"])
        .inc_by(summary.skipped as f64);
}

/// Merge the snapshot at `secondary` into the container's stores.
///
/// Encrypted transactions are merged, raw transactions are copied when
/// absent. The caller persists the container afterwards.
#[instrument(name = "migrate", skip(container))]
pub fn run_migration(
    container: &RelayContainer,
    secondary: &Path,
) -> Result<MigrationSummary, MigrateError> {
    if !secondary.exists() {
        return Err(MigrateError::MissingSecondary(secondary.to_path_buf()));
    }
    let source = SnapshotStores::load(secondary)?;

    let result = container
        .dataset_merger(source.encrypted.clone())
        .and_then(|merger| {
            let encrypted = merger.migrate()?;
            let raw = merger.migrate_raw(container.stores.raw.as_ref(), source.raw.as_ref())?;
            Ok(encrypted.combine(raw))
        });

    match result {
        Ok(summary) => {
            record_summary(&summary);
            info!("[pr-01] migrated {}: {}", secondary.display(), summary);
            Ok(summary)
        }
        Err(err) => {
            metric_inc!(SUBSYSTEM_ERRORS, &["migration", "merge"]);
            error!("[pr-01] migration of {} failed: {}", secondary.display(), err);
            Err(err.into())
        }
    }
}
