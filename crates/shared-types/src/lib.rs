//! # Shared Types Crate
//!
//! This crate contains the payload value types shared by every Private-Relay
//! subsystem, together with the outbound ports they are wired against.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `EncodedPayload` and the transaction rows are
//!   defined once, here.
//! - **Value semantics**: payloads are never mutated through a builder; the
//!   `with_*` helpers consume a value and return a new one.
//! - **Ports, not singletons**: Enclave, Discovery and the DAOs are traits that
//!   the node runtime wires explicitly at startup.

pub mod entities;
pub mod errors;
pub mod memory;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use entities::*;
pub use errors::*;
pub use memory::{
    InMemoryEncryptedTransactionStore, InMemoryRawTransactionStore, InMemoryStagingStore, PartyInfo,
    StaticDiscovery,
};
pub use ports::*;
