//! # Value Objects
//!
//! Phase outcomes and the recovery report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of one recovery phase. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryResult {
    /// Everything succeeded.
    Success,
    /// Some items failed.
    PartialSuccess,
    /// Nothing succeeded.
    Failure,
}

impl RecoveryResult {
    /// Process exit code.
    pub fn code(self) -> i32 {
        match self {
            RecoveryResult::Success => 0,
            RecoveryResult::PartialSuccess => 1,
            RecoveryResult::Failure => 2,
        }
    }

    /// Worse of two outcomes.
    pub fn worst(self, other: RecoveryResult) -> RecoveryResult {
        self.max(other)
    }
}

impl fmt::Display for RecoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryResult::Success => "SUCCESS",
            RecoveryResult::PartialSuccess => "PARTIAL_SUCCESS",
            RecoveryResult::Failure => "FAILURE",
        };
        f.write_str(name)
    }
}

/// Per-phase outcomes and timings of a full recovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Request phase outcome.
    pub request: RecoveryResult,
    /// Stage phase outcome.
    pub stage: RecoveryResult,
    /// Sync phase outcome.
    pub sync: RecoveryResult,
    /// Request phase wall time.
    pub request_duration: Duration,
    /// Stage phase wall time.
    pub stage_duration: Duration,
    /// Sync phase wall time.
    pub sync_duration: Duration,
}

impl RecoveryReport {
    /// Worst phase outcome.
    pub fn outcome(&self) -> RecoveryResult {
        self.request.worst(self.stage).worst(self.sync)
    }

    /// Total wall time.
    pub fn total_duration(&self) -> Duration {
        self.request_duration + self.stage_duration + self.sync_duration
    }
}

impl fmt::Display for RecoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request: {} ({} ms), stage: {} ({} ms), sync: {} ({} ms)",
            self.request,
            self.request_duration.as_millis(),
            self.stage,
            self.stage_duration.as_millis(),
            self.sync,
            self.sync_duration.as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(RecoveryResult::Success.code(), 0);
        assert_eq!(RecoveryResult::PartialSuccess.code(), 1);
        assert_eq!(RecoveryResult::Failure.code(), 2);
    }

    #[test]
    fn test_report_outcome_is_worst_phase() {
        let report = RecoveryReport {
            request: RecoveryResult::Success,
            stage: RecoveryResult::PartialSuccess,
            sync: RecoveryResult::Success,
            request_duration: Duration::from_millis(5),
            stage_duration: Duration::from_millis(1),
            sync_duration: Duration::from_millis(2),
        };
        assert_eq!(report.outcome(), RecoveryResult::PartialSuccess);
        assert_eq!(report.total_duration(), Duration::from_millis(8));
        assert!(report.to_string().contains("stage: PARTIAL_SUCCESS"));
    }
}
