//! # Payload Merge Configuration
//!
//! Configuration for dataset consolidation.

use serde::{Deserialize, Serialize};

use crate::domain::MigrationError;

/// Default rows fetched per page from the secondary dataset.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Dataset consolidation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Rows fetched per page from the secondary dataset.
    pub page_size: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MergeConfig {
    /// Create a config for testing (tiny pages to exercise paging).
    pub fn for_testing() -> Self {
        Self { page_size: 2 }
    }

    /// Reject unusable values.
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.page_size == 0 {
            return Err(MigrationError::InvalidConfig(
                "page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
