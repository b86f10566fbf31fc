//! Prometheus metrics for Private-Relay.
//!
//! All metrics follow the naming convention: `relay_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., resend_payloads_published_total)
//! - **Gauge**: Value that can go up or down (e.g., recovery_staged_rows)
//! - **Histogram**: Distribution of values (e.g., recovery_phase_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MIGRATION METRICS
    // =========================================================================

    /// Rows handled by a dataset merge
    pub static ref MIGRATION_ROWS: CounterVec = CounterVec::new(
        Opts::new("relay_migration_rows_total", "Rows processed by dataset merge"),
        &["outcome"]  // outcome: inserted/merged/skipped
    ).expect("metric creation failed");

    // =========================================================================
    // RESEND METRICS
    // =========================================================================

    /// Payloads pushed to remote nodes
    pub static ref RESEND_PUBLISHED: Counter = Counter::new(
        "relay_resend_payloads_published_total",
        "Total payloads published to remote nodes during resend"
    ).expect("metric creation failed");

    /// Payloads that failed to reach their recipient
    pub static ref RESEND_FAILED: Counter = Counter::new(
        "relay_resend_payloads_failed_total",
        "Total payloads that could not be published during resend"
    ).expect("metric creation failed");

    // =========================================================================
    // RECOVERY METRICS
    // =========================================================================

    /// Recovery phases by outcome
    pub static ref RECOVERY_PHASES: CounterVec = CounterVec::new(
        Opts::new("relay_recovery_phases_total", "Recovery phases by outcome"),
        &["phase", "outcome"]  // phase: request/stage/sync, outcome: success/partial/failure
    ).expect("metric creation failed");

    /// Recovery phase duration
    pub static ref RECOVERY_PHASE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "relay_recovery_phase_duration_seconds",
            "Time spent in each recovery phase"
        ).buckets(exponential_buckets(0.01, 2.0, 16).expect("bucket creation failed")),
        &["phase"]
    ).expect("metric creation failed");

    /// Rows left in the staging area
    pub static ref STAGED_ROWS: Gauge = Gauge::new(
        "relay_recovery_staged_rows",
        "Number of rows currently held in the staging area"
    ).expect("metric creation failed");

    // =========================================================================
    // PEER METRICS
    // =========================================================================

    /// Known remote nodes
    pub static ref PEERS_KNOWN: Gauge = Gauge::new(
        "relay_peers_known",
        "Number of remote nodes in party info"
    ).expect("metric creation failed");

    /// Remote calls by operation and outcome
    pub static ref REMOTE_CALLS: CounterVec = CounterVec::new(
        Opts::new("relay_remote_calls_total", "Calls to remote nodes"),
        &["operation", "outcome"]
    ).expect("metric creation failed");

    /// Remote call latency
    pub static ref REMOTE_CALL_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "relay_remote_call_duration_seconds",
            "Latency of calls to remote nodes"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("bucket creation failed"))
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Errors by component and type
    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("relay_errors_total", "Errors by component and type"),
        &["component", "error_type"]
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Render the registry in Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }

    /// Write the registry to `path` in Prometheus text format.
    ///
    /// The text goes to a sibling temporary file first and is renamed into
    /// place, so a textfile collector never reads a partial export.
    pub fn write_to(&self, path: &Path) -> Result<(), TelemetryError> {
        let text = self.encode()?;
        let export_err = |source| TelemetryError::MetricsExport {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(export_err)?;
        }
        let staging = path.with_extension("prom.tmp");
        fs::write(&staging, text).map_err(export_err)?;
        fs::rename(&staging, path).map_err(export_err)
    }
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless: collectors that are already
/// registered are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Migration
        Box::new(MIGRATION_ROWS.clone()),
        // Resend
        Box::new(RESEND_PUBLISHED.clone()),
        Box::new(RESEND_FAILED.clone()),
        // Recovery
        Box::new(RECOVERY_PHASES.clone()),
        Box::new(RECOVERY_PHASE_DURATION.clone()),
        Box::new(STAGED_ROWS.clone()),
        // Peers
        Box::new(PEERS_KNOWN.clone()),
        Box::new(REMOTE_CALLS.clone()),
        Box::new(REMOTE_CALL_DURATION.clone()),
        // Errors
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
