//! # Resend Configuration
//!
//! Configuration for the resend managers.

use serde::{Deserialize, Serialize};

/// Upper bound on the publish batch size a peer may request.
pub const MAX_RESULTS: usize = 10_000;

/// Resend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ResendConfig {
    /// Rows fetched per page while walking the store.
    pub fetch_size: usize,

    /// Largest publish batch honoured; also used when a request omits one.
    pub max_results: usize,

    /// Concurrent publishes in a fan-out.
    pub publish_concurrency: usize,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            fetch_size: 1000,
            max_results: MAX_RESULTS,
            publish_concurrency: 8,
        }
    }
}

impl ResendConfig {
    /// Create a config for testing (small pages).
    pub fn for_testing() -> Self {
        Self {
            fetch_size: 5,
            max_results: MAX_RESULTS,
            publish_concurrency: 2,
        }
    }

    /// Effective publish batch size for a requested size.
    pub fn batch_size_for(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(size) if size > 0 && size <= self.max_results => size,
            _ => self.max_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResendConfig::default();
        assert_eq!(config.max_results, 10_000);
        assert_eq!(config.fetch_size, 1000);
    }

    #[test]
    fn test_batch_size_capped() {
        let config = ResendConfig::default();
        assert_eq!(config.batch_size_for(Some(3)), 3);
        assert_eq!(config.batch_size_for(None), 10_000);
        assert_eq!(config.batch_size_for(Some(10_000_000)), 10_000);
        assert_eq!(config.batch_size_for(Some(0)), 10_000);
    }
}
