//! # Command Handlers
//!
//! Drive one subsystem operation against a built
//! [`RelayContainer`](crate::container::RelayContainer) and record its
//! outcome in the relay metrics.
//!
//! ```text
//! CLI command ──→ handler ──→ subsystem (pr-01 / pr-02 / pr-03)
//!                    │
//!                    └──→ relay-telemetry counters
//! ```

pub mod migrate;
pub mod recover;
pub mod resend;

pub use migrate::{run_migration, MigrateError};
pub use recover::{record_report, run_recovery};
pub use resend::{run_resend, ResendCommand, ResendOutcome};
