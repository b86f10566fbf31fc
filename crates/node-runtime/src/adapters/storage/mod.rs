//! # Storage Adapters
//!
//! The node keeps its stores in memory (`shared-types` DAO adapters) and
//! persists them as a JSON snapshot between runs.

pub mod snapshot;

pub use snapshot::{load_party_info, SnapshotError, SnapshotStores, StoreSnapshot};
