//! # Inbound Ports

use async_trait::async_trait;

use crate::domain::{RecoveryError, RecoveryReport, RecoveryResult};

/// Recovery API - inbound port.
#[async_trait]
pub trait Recovery: Send + Sync {
    /// Ask every peer to push all transactions for this node's keys.
    async fn request(&self) -> RecoveryResult;

    /// Assign stage numbers to staged rows in dependency order.
    async fn stage(&self) -> RecoveryResult;

    /// Store staged rows into the canonical store.
    async fn sync(&self) -> RecoveryResult;

    /// Precheck, then run every phase.
    async fn run(&self) -> Result<RecoveryReport, RecoveryError>;

    /// Full recovery as a process exit code.
    async fn recover(&self) -> i32 {
        match self.run().await {
            Ok(report) => report.outcome().code(),
            Err(_) => RecoveryResult::Failure.code(),
        }
    }
}
