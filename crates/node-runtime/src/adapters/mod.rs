//! # Adapter Implementations
//!
//! Concrete implementations of the outbound ports the subsystems are wired
//! against:
//!
//! 1. **Transports**: HTTP peer client and remote enclave, or offline
//!    stand-ins, selected by [`TransportKind`](crate::container::TransportKind)
//! 2. **Metering**: publisher decorators feeding the resend counters
//! 3. **Storage**: JSON snapshots of the in-memory stores
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 OUTER LAYER (node-runtime)                   │
//! │  HttpPeerClient, HttpEnclaveClient, Offline*, SnapshotStores │
//! │                        ↑ implements ↑                        │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  MIDDLE LAYER (Ports)                                  │  │
//! │  │  Enclave, RecoveryClient, PayloadPublisher, DAOs       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                          ↑ uses ↑                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  INNER LAYER: pr-01 merge, pr-02 resend, pr-03 recovery│  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod enclave;
pub mod http;
pub mod metered;
pub mod offline;
pub mod storage;
pub mod transport;

pub use enclave::HttpEnclaveClient;
pub use http::HttpPeerClient;
pub use metered::{MeteredBatchPublisher, MeteredPayloadPublisher};
pub use offline::{OfflineEnclave, OfflinePeerClient};
pub use storage::{load_party_info, SnapshotError, SnapshotStores, StoreSnapshot};
pub use transport::{build_transports, TransportError, Transports};
