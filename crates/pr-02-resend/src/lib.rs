//! # PR-02 Resend
//!
//! Pushes stored transactions back out to peers that lost them, and accepts
//! this node's own transactions when peers send them back.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - `ResendManager`: re-accept a payload this node originally sent, merging
//!   it with any stored copy.
//! - `BatchResendManager`: answer "resend everything for key K" by walking the
//!   store through the batch workflow, and stage payloads pushed by peers.
//! - `LegacyResendManager`: the same for peers without batch support, plus
//!   single-transaction resend.
//!
//! ## Batch Workflow
//!
//! | Step | On miss |
//! |------|---------|
//! | ValidateEnclaveStatus | abort run |
//! | FilterPayload | skip transaction |
//! | PreparePayloadForRecipient | skip transaction |
//! | SearchRecipientKeyForPayload | abort run |
//! | FindRecipientFromPartyInfo | skip transaction |
//! | SenderIsNotRecipient | skip transaction |
//! | EncodedPayloadPublisher / StandardPayloadPublisher | count failure |
//!
//! ## Module Structure
//!
//! ```text
//! pr-02-resend/
//! ├── domain/          # ResendError, messages, BatchWorkflowContext
//! ├── ports/           # Manager traits (inbound) + network traits (outbound)
//! ├── workflow/        # BatchWorkflow, actions, publishers, factories
//! ├── application/     # ResendManagerImpl, BatchResendManagerImpl, LegacyResendManagerImpl
//! ├── adapters/        # Countdown latch, async fan-out, client-backed publisher
//! └── config.rs        # ResendConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod workflow;

// Re-exports
pub use adapters::{
    AsyncBatchPayloadPublisher, CancellableCountDownLatch, ClientResendBatchPublisher,
};
pub use application::{BatchResendManagerImpl, LegacyResendManagerImpl, ResendManagerImpl};
pub use config::ResendConfig;
pub use domain::{
    BatchWorkflowContext, PushBatchRequest, ResendBatchRequest, ResendBatchResponse, ResendError,
    ResendRequest, ResendRequestKind, ResendResponse,
};
pub use ports::{
    BatchResendManager, LegacyResendManager, PayloadPublisher, PrivacyGroupPublisher,
    RecoveryClient, ResendBatchPublisher, ResendManager,
};
pub use workflow::{BatchWorkflow, BatchWorkflowAction, BatchWorkflowFactory, LegacyWorkflowFactory};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
