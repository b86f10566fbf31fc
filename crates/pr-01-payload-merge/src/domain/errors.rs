//! # Domain Errors
//!
//! Error types for payload merge and dataset consolidation.

use shared_types::StoreError;
use thiserror::Error;

/// Dataset consolidation errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Reading from the secondary dataset failed.
    #[error("Failed to read secondary dataset at offset {offset}: {source}")]
    SecondaryRead {
        /// Page offset being read.
        offset: u64,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Writing to the primary dataset failed.
    #[error("Failed to write primary dataset: {0}")]
    PrimaryWrite(#[source] StoreError),

    /// Reading from the primary dataset failed.
    #[error("Failed to read primary dataset: {0}")]
    PrimaryRead(#[source] StoreError),

    /// Invalid configuration.
    #[error("Invalid migration configuration: {0}")]
    InvalidConfig(String),
}
