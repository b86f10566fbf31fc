//! # Outcome Aggregation
//!
//! Folding per-item results into a phase outcome, and grouping staged rows.

use shared_types::StagingTransaction;

use crate::domain::RecoveryResult;

/// Phase outcome from `failures` out of `attempts` items.
///
/// Zero attempts is a success.
pub fn aggregate(failures: u64, attempts: u64) -> RecoveryResult {
    if failures == 0 {
        RecoveryResult::Success
    } else if failures >= attempts {
        RecoveryResult::Failure
    } else {
        RecoveryResult::PartialSuccess
    }
}

/// Split rows into runs of adjacent rows sharing a hash, keeping order.
pub fn group_by_hash(rows: Vec<StagingTransaction>) -> Vec<Vec<StagingTransaction>> {
    let mut groups: Vec<Vec<StagingTransaction>> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some(group) if group[0].hash == row.hash => group.push(row),
            _ => groups.push(vec![row]),
        }
    }
    groups
}
