//! # Value Objects
//!
//! Outcome reporting for dataset consolidation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts produced by one consolidation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Rows copied because the primary did not have them.
    pub inserted: u64,
    /// Rows present in both datasets whose payloads were merged.
    pub merged: u64,
    /// Rows left untouched (raw rows already present).
    pub skipped: u64,
}

impl MigrationSummary {
    /// Total rows visited.
    pub fn total(&self) -> u64 {
        self.inserted + self.merged + self.skipped
    }

    /// Combine two summaries.
    pub fn combine(self, other: MigrationSummary) -> MigrationSummary {
        MigrationSummary {
            inserted: self.inserted + other.inserted,
            merged: self.merged + other.merged,
            skipped: self.skipped + other.skipped,
        }
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} merged={} skipped={}",
            self.inserted, self.merged, self.skipped
        )
    }
}
