//! # Recovery Configuration

use serde::{Deserialize, Serialize};

/// Rows promoted or synced per database round trip.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Recovery configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Rows per staging promotion and per sync page.
    pub batch_size: usize,

    /// Peers contacted at once during the request phase.
    pub request_concurrency: usize,

    /// Attempts per resend request before a peer counts as failed.
    pub max_attempts: u32,

    /// Push batch size asked of batch-capable peers.
    pub resend_batch_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_concurrency: 8,
            max_attempts: 5,
            resend_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl RecoveryConfig {
    /// Create a config for testing (small batches, few retries).
    pub fn for_testing() -> Self {
        Self {
            batch_size: 3,
            request_concurrency: 2,
            max_attempts: 3,
            resend_batch_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RecoveryConfig::default();
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RecoveryConfig = serde_json::from_str(r#"{"max_attempts": 2}"#).unwrap();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.request_concurrency, 8);
    }
}
