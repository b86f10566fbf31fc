//! # Inbound Ports
//!
//! API traits the transport layer calls into.

use async_trait::async_trait;
use shared_types::EncodedPayload;

use crate::domain::{
    PushBatchRequest, ResendBatchRequest, ResendBatchResponse, ResendError, ResendRequest,
    ResendResponse,
};

/// Accepts transactions this node sent that a peer is handing back.
#[async_trait]
pub trait ResendManager: Send + Sync {
    /// Store or merge a payload whose sender is one of this node's keys.
    async fn accept_own_message(&self, payload: EncodedPayload) -> Result<(), ResendError>;
}

/// Batch resend API for peers that advertise batch recovery.
#[async_trait]
pub trait BatchResendManager: Send + Sync {
    /// Push every stored transaction involving the requested key to its owner.
    async fn resend_batch(
        &self,
        request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, ResendError>;

    /// Record payloads a peer pushed to us in the staging area.
    async fn store_resend_batch(&self, request: PushBatchRequest) -> Result<(), ResendError>;

    /// Drop every staged row.
    async fn cleanup_staging_area(&self) -> Result<(), ResendError>;
}

/// Resend API for peers without batch support.
#[async_trait]
pub trait LegacyResendManager: Send + Sync {
    /// Resend one or all transactions for the request's recipient.
    async fn resend(&self, request: ResendRequest) -> Result<ResendResponse, ResendError>;
}
