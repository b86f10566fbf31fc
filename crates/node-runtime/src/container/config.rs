//! # Node Configuration
//!
//! Unified configuration for every subsystem and the runtime.
//!
//! Loaded from a TOML file (every section optional) and then overridden by
//! `RELAY_*` environment variables.
//!
//! ```toml
//! [node]
//! url = "http://127.0.0.1:9001"
//! party_info = "party-info.json"
//!
//! [transport]
//! kind = "http"
//! request_timeout_secs = 30
//!
//! [enclave]
//! url = "http://127.0.0.1:9081"
//!
//! [recovery]
//! batch_size = 10000
//! ```

use std::path::{Path, PathBuf};

use pr_01_payload_merge::MergeConfig;
use pr_02_resend::ResendConfig;
use pr_03_recovery::RecoveryConfig;
use relay_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// This node's identity and network view.
    pub node: NodeSection,
    /// Local persistence.
    pub storage: StorageConfig,
    /// How remote calls are made.
    pub transport: TransportConfig,
    /// Remote enclave location.
    pub enclave: EnclaveConfig,
    /// Resend managers.
    pub resend: ResendConfig,
    /// Recovery orchestrator.
    pub recovery: RecoveryConfig,
    /// Dataset consolidation.
    pub migration: MergeConfig,
    /// Logging.
    pub telemetry: TelemetryConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Cannot read config file {}: {source}", .path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has an unusable value.
    #[error("Invalid value {value:?} for {variable}")]
    InvalidOverride {
        /// Environment variable name.
        variable: &'static str,
        /// Value found.
        value: String,
    },

    /// The HTTP transport needs an enclave URL.
    #[error("transport 'http' requires enclave.url (or RELAY_ENCLAVE_URL)")]
    MissingEnclaveUrl,

    /// Any other rejected value.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl RelayConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.telemetry = config.telemetry.with_env_overrides();
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `RELAY_*` overrides looked up through `lookup`.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `RELAY_URL` | `node.url` |
    /// | `RELAY_PARTY_INFO` | `node.party_info` |
    /// | `RELAY_DATA_DIR` | `storage.data_dir` |
    /// | `RELAY_TRANSPORT` | `transport.kind` |
    /// | `RELAY_ENCLAVE_URL` | `enclave.url` |
    /// | `RELAY_RECOVERY_BATCH_SIZE` | `recovery.batch_size` |
    /// | `RELAY_RESEND_FETCH_SIZE` | `resend.fetch_size` |
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RELAY_URL") {
            self.node.url = url;
        }
        if let Some(path) = lookup("RELAY_PARTY_INFO") {
            self.node.party_info = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("RELAY_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup("RELAY_TRANSPORT") {
            self.transport.kind = match kind.to_lowercase().as_str() {
                "http" => TransportKind::Http,
                "offline" => TransportKind::Offline,
                _ => {
                    return Err(ConfigError::InvalidOverride {
                        variable: "RELAY_TRANSPORT",
                        value: kind,
                    })
                }
            };
        }
        if let Some(url) = lookup("RELAY_ENCLAVE_URL") {
            self.enclave.url = Some(url);
        }
        if let Some(value) = lookup("RELAY_RECOVERY_BATCH_SIZE") {
            self.recovery.batch_size = parse_size("RELAY_RECOVERY_BATCH_SIZE", value)?;
        }
        if let Some(value) = lookup("RELAY_RESEND_FETCH_SIZE") {
            self.resend.fetch_size = parse_size("RELAY_RESEND_FETCH_SIZE", value)?;
        }
        Ok(())
    }

    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.url.trim().is_empty() {
            return Err(ConfigError::Invalid("node.url must not be empty".to_string()));
        }
        if self.transport.kind == TransportKind::Http && self.enclave.url.is_none() {
            return Err(ConfigError::MissingEnclaveUrl);
        }
        if self.recovery.batch_size == 0 || self.resend.fetch_size == 0 {
            return Err(ConfigError::Invalid(
                "recovery.batch_size and resend.fetch_size must be positive".to_string(),
            ));
        }
        self.migration
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Small batches, offline transport and quiet logs.
    pub fn for_testing(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            node: NodeSection::default(),
            storage: StorageConfig {
                data_dir: data_dir.into(),
                ..StorageConfig::default()
            },
            transport: TransportConfig {
                kind: TransportKind::Offline,
                ..TransportConfig::default()
            },
            enclave: EnclaveConfig::default(),
            resend: ResendConfig::for_testing(),
            recovery: RecoveryConfig::for_testing(),
            migration: MergeConfig::for_testing(),
            telemetry: TelemetryConfig::for_testing(),
        }
    }
}

fn parse_size(variable: &'static str, value: String) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ConfigError::InvalidOverride { variable, value }),
    }
}

/// This node's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSection {
    /// Base URL peers use to reach this node.
    pub url: String,
    /// JSON file holding the party info (this node plus remotes).
    pub party_info: Option<PathBuf>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9001".to_string(),
            party_info: None,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the store snapshot.
    pub data_dir: PathBuf,
    /// Snapshot file name inside `data_dir`.
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            snapshot_file: "store.json".to_string(),
        }
    }
}

impl StorageConfig {
    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }
}

/// Which transport remote calls go through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// JSON over HTTP.
    #[default]
    Http,
    /// Every remote call fails immediately.
    Offline,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport implementation.
    pub kind: TransportKind,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Http,
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

/// Remote enclave configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclaveConfig {
    /// Base URL of the enclave service.
    pub url: Option<String>,
}
