//! # Relay Telemetry
//!
//! Structured logging and Prometheus metrics for Private-Relay.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // Logs and metrics are now being collected
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RELAY_SERVICE_NAME` | `private-relay` | Service name in log lines |
//! | `RELAY_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `RELAY_JSON_LOGS` | `false` | Emit JSON lines |
//! | `RELAY_CONSOLE_OUTPUT` | `true` | Print logs to stdout |
//! | `RELAY_METRICS_FILE` | unset | Prometheus text file written on exit |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    register_metrics, HistogramTimer, MetricsHandle, MIGRATION_ROWS, PEERS_KNOWN,
    RECOVERY_PHASES, RECOVERY_PHASE_DURATION, REMOTE_CALLS, REMOTE_CALL_DURATION, RESEND_FAILED,
    RESEND_PUBLISHED, STAGED_ROWS, SUBSYSTEM_ERRORS,
};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Prometheus registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// The metrics file could not be written.
    #[error("Cannot write metrics to {}: {source}", .path.display())]
    MetricsExport {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Bad level directive or other configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    logging::init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
        metrics_file: config.metrics_file,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    metrics_file: Option<PathBuf>,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered for this process.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Write the metrics file, if one is configured. Returns the path written.
    pub fn export_metrics(&self) -> Result<Option<&Path>, TelemetryError> {
        let Some(path) = self.metrics_file.as_deref() else {
            return Ok(None);
        };
        self.metrics.write_to(path)?;
        tracing::debug!("Metrics written to {}", path.display());
        Ok(Some(path))
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_macros() {
        metric_inc!(RESEND_FAILED);
        metric_inc!(SUBSYSTEM_ERRORS, &["resend", "node_offline"]);
        metric_observe!(REMOTE_CALL_DURATION, 0.02);
        assert!(RESEND_FAILED.get() >= 1.0);
        assert!(
            SUBSYSTEM_ERRORS
                .with_label_values(&["resend", "node_offline"])
                .get()
                >= 1.0
        );
    }

    fn guard(metrics_file: Option<PathBuf>) -> TelemetryGuard {
        TelemetryGuard {
            service_name: "test".to_string(),
            metrics_file,
            metrics: register_metrics().unwrap(),
        }
    }

    #[test]
    fn test_export_without_file_is_noop() {
        assert_eq!(guard(None).export_metrics().unwrap(), None);
    }

    #[test]
    fn test_export_writes_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.prom");
        let guard = guard(Some(path.clone()));
        metric_inc!(RECOVERY_PHASES, &["request", "failure"]);

        assert_eq!(guard.export_metrics().unwrap(), Some(path.as_path()));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("relay_recovery_phases_total"));
    }
}
