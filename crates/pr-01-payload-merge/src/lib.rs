//! # PR-01 Payload Merge
//!
//! Reconciles two independently recorded views of the same encrypted
//! transaction into one canonical payload, and consolidates whole datasets
//! with it.
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Two copies of a payload can differ in which recipient boxes they carry:
//! one node's resend logic rebuilds its own view, a peer supplies another, or
//! two tenants' databases are consolidated. Merging must never re-encrypt,
//! reorder or drop an existing (key, box) pair.
//!
//! ## Merge Rules
//!
//! | Primary mode | Complete when | Otherwise |
//! |--------------|---------------|-----------|
//! | PRIVATE_STATE_VALIDATION | every key has a box | prepend secondary's boxed recipients |
//! | PARTY_PROTECTION | sender is a recipient | append keys and boxes |
//! | STANDARD_PRIVATE / MANDATORY_RECIPIENTS | sender is a recipient | append, or keep the legacy empty side |
//!
//! ## Module Structure
//!
//! ```text
//! pr-01-payload-merge/
//! ├── domain/          # MigrationError, MigrationSummary
//! ├── algorithms/      # merge(), calculate_batch_count()
//! ├── application/     # DatasetMerger
//! └── config.rs        # MergeConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;

// Re-exports
pub use algorithms::{calculate_batch_count, combine_affected, merge};
pub use application::DatasetMerger;
pub use config::MergeConfig;
pub use domain::{MigrationError, MigrationSummary};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
