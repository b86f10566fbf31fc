//! # PR-03 Recovery
//!
//! Rebuilds a node's transaction store from its peers after downtime.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Phases
//!
//! | Phase | Does | SUCCESS | FAILURE |
//! |-------|------|---------|---------|
//! | request | ask every peer to push all transactions for our keys | every peer answered | no peer answered |
//! | stage | assign dependency-ordered stage numbers to staged rows | every row staged | nothing staged |
//! | sync | store staged rows in (stage, hash) order | no row failed | every row failed |
//!
//! `recover()` checks the staging area is empty, runs the three phases and
//! returns the worst outcome as a process exit code (0, 1 or 2).
//!
//! ## Module Structure
//!
//! ```text
//! pr-03-recovery/
//! ├── domain/          # RecoveryResult, RecoveryReport, RecoveryError, StorePayloadError
//! ├── algorithms/      # outcome aggregation, hash grouping
//! ├── ports/           # Recovery (inbound), BatchTransactionRequester + PayloadStore (outbound)
//! ├── adapters/        # BatchTransactionRequesterImpl, MergingPayloadStore
//! ├── application/     # RecoveryService
//! └── config.rs        # RecoveryConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{BatchTransactionRequesterImpl, MergingPayloadStore};
pub use algorithms::{aggregate, group_by_hash};
pub use application::RecoveryService;
pub use config::RecoveryConfig;
pub use domain::{RecoveryError, RecoveryReport, RecoveryResult, StorePayloadError};
pub use ports::{BatchTransactionRequester, PayloadStore, Recovery};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
