//! # Ports Module
//!
//! Inbound (manager API) and outbound (network) ports.

pub mod inbound;
pub mod outbound;

pub use inbound::{BatchResendManager, LegacyResendManager, ResendManager};
pub use outbound::{PayloadPublisher, PrivacyGroupPublisher, RecoveryClient, ResendBatchPublisher};

#[cfg(any(test, feature = "test-utils"))]
pub use outbound::{MockPayloadPublisher, MockRecoveryClient, MockResendBatchPublisher};
