//! # Relay Container
//!
//! Central container holding every subsystem instance, with explicit
//! dependency injection and no process-wide singletons.
//!
//! - Subsystems built once, in dependency order
//! - Remote collaborators resolved through `TransportKind`

pub mod config;
pub mod subsystems;

pub use config::{
    ConfigError, EnclaveConfig, NodeSection, RelayConfig, StorageConfig, TransportConfig,
    TransportKind,
};
pub use subsystems::{build_discovery, ContainerError, RelayContainer};
