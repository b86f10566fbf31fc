//! # Ports Module
//!
//! Recovery API (inbound) and peer/store collaborators (outbound).

pub mod inbound;
pub mod outbound;

pub use inbound::Recovery;
pub use outbound::{BatchTransactionRequester, PayloadStore};

#[cfg(any(test, feature = "test-utils"))]
pub use outbound::{MockPayloadStore, MockTransactionRequester};
