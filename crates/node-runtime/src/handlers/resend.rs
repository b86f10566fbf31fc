//! # Resend Handler
//!
//! Operator-triggered resends: push every transaction for a key to its
//! owner, either through the batch API or the legacy fan-out, or fetch one
//! transaction as the key's owner would see it.

use pr_02_resend::{
    BatchResendManager, LegacyResendManager, ResendBatchRequest, ResendError, ResendRequest,
};
use relay_telemetry::{metric_inc, SUBSYSTEM_ERRORS};
use shared_types::{EncodedPayload, MessageHash, PublicKey};
use tracing::{info, instrument, warn};

use crate::container::RelayContainer;

/// A resend the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendCommand {
    /// Batch push of every transaction involving `key`.
    Batch {
        /// Key whose transactions are pushed.
        key: PublicKey,
        /// Push batch size, defaulting to the configured maximum.
        batch_size: Option<usize>,
    },
    /// Legacy one-by-one push of every transaction involving `key`.
    LegacyAll {
        /// Key whose transactions are pushed.
        key: PublicKey,
    },
    /// Single transaction, prepared for `key`.
    Individual {
        /// Key asking for the transaction.
        key: PublicKey,
        /// Transaction hash.
        hash: MessageHash,
    },
}

/// What a resend produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// Transactions published by a batch resend.
    Published(u64),
    /// Legacy fan-out finished.
    Dispatched,
    /// The requested transaction.
    Payload(Box<EncodedPayload>),
}

/// Execute `command` against the container's resend managers.
#[instrument(name = "resend", skip(container))]
pub async fn run_resend(
    container: &RelayContainer,
    command: ResendCommand,
) -> Result<ResendOutcome, ResendError> {
    let result = match command {
        ResendCommand::Batch { key, batch_size } => container
            .batch_resend_manager
            .resend_batch(ResendBatchRequest::new(key, batch_size))
            .await
            .map(|response| ResendOutcome::Published(response.total)),
        ResendCommand::LegacyAll { key } => container
            .legacy_resend_manager
            .resend(ResendRequest::all(key))
            .await
            .map(|_| ResendOutcome::Dispatched),
        ResendCommand::Individual { key, hash } => container
            .legacy_resend_manager
            .resend(ResendRequest::individual(key, hash.clone()))
            .await?
            .payload
            .map(|payload| ResendOutcome::Payload(Box::new(payload)))
            .ok_or(ResendError::TransactionNotFound(hash)),
    };

    match &result {
        Ok(outcome) => info!("[pr-02] resend finished: {:?}", outcome),
        Err(err) => {
            metric_inc!(SUBSYSTEM_ERRORS, &["resend", "request"]);
            warn!("[pr-02] resend failed: {}", err);
        }
    }
    result
}
