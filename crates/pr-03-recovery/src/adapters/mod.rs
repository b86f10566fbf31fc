//! # Adapters Module
//!
//! Network requester and merge-aware payload store.

pub mod payload_store;
pub mod requester;

pub use payload_store::MergingPayloadStore;
pub use requester::BatchTransactionRequesterImpl;
