//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Logging and metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to log lines.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `tracing` directive string.
    pub log_level: String,

    /// Emit JSON lines instead of human readable output.
    pub json_logs: bool,

    /// Whether to print logs at all.
    pub console_output: bool,

    /// Prometheus text file written when a command finishes.
    pub metrics_file: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "private-relay".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
            metrics_file: None,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RELAY_SERVICE_NAME`: Service name (default: private-relay)
    /// - `RELAY_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `RELAY_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `RELAY_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `RELAY_METRICS_FILE`: Metrics export file (default: none)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        if let Ok(name) = env::var("RELAY_SERVICE_NAME") {
            self.service_name = name;
        }
        if let Ok(level) = env::var("RELAY_LOG_LEVEL").or_else(|_| env::var("RUST_LOG")) {
            self.log_level = level;
        }
        match env::var("RELAY_JSON_LOGS") {
            Ok(value) => self.json_logs = parse_flag(&value),
            Err(_) if is_container => self.json_logs = true,
            Err(_) => {}
        }
        if let Ok(value) = env::var("RELAY_CONSOLE_OUTPUT") {
            self.console_output = parse_flag(&value);
        }
        if let Ok(path) = env::var("RELAY_METRICS_FILE") {
            self.metrics_file = Some(PathBuf::from(path));
        }
        self
    }

    /// Quiet configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            log_level: "warn".to_string(),
            console_output: false,
            ..Self::default()
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "private-relay");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(config.metrics_file.is_none());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }

    #[test]
    fn test_for_testing_is_quiet() {
        let config = TelemetryConfig::for_testing();
        assert!(!config.console_output);
        assert_eq!(config.log_level, "warn");
    }
}
