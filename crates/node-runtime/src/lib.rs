//! # Node Runtime Library
//!
//! Wires the relay subsystems against their adapters and exposes the
//! command handlers the `private-relay` binary runs. Exposed as a library
//! so integration tests can build containers over in-process transports.
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal Architecture**: subsystems own ports, this crate owns adapters
//! - **Explicit DI**: every service is built once in [`RelayContainer`]
//! - **Pluggable transports**: HTTP or offline, selected by configuration
//!
//! ## Module Structure
//!
//! ```text
//! node-runtime/
//! ├── adapters/    # HTTP peer + enclave clients, offline stand-ins, snapshots
//! ├── container/   # RelayConfig and RelayContainer
//! └── handlers/    # recover, resend, migrate
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod container;
pub mod handlers;

// Re-exports
pub use container::{ConfigError, ContainerError, RelayConfig, RelayContainer, TransportKind};
pub use handlers::{
    run_migration, run_recovery, run_resend, MigrateError, ResendCommand, ResendOutcome,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
