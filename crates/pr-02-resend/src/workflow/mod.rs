//! # Batch Workflow
//!
//! An ordered chain of actions applied to one transaction at a time. Each
//! action returns `Ok(true)` to continue, `Ok(false)` to drop the transaction,
//! or an error that aborts the whole run.

pub mod actions;
pub mod factory;
pub mod publishers;

use async_trait::async_trait;
use tracing::trace;

use crate::domain::{BatchWorkflowContext, ResendError};

pub use actions::{
    FilterPayload, FindRecipientFromPartyInfo, PreparePayloadForRecipient,
    SearchRecipientKeyForPayload, SenderIsNotRecipient, ValidateEnclaveStatus,
};
pub use factory::{BatchWorkflowFactory, LegacyWorkflowFactory};
pub use publishers::{EncodedPayloadPublisher, StandardPayloadPublisher};

/// One step of the batch workflow.
#[async_trait]
pub trait BatchWorkflowAction: Send {
    /// Step name for logging.
    fn name(&self) -> &'static str;

    /// Process the context.
    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError>;

    /// Called after a transaction was dropped, with the lowered expected total.
    async fn check_outstanding(&mut self, _context: &BatchWorkflowContext) {}

    /// Called once after the last transaction.
    async fn flush(&mut self) {}

    /// Transactions this step published.
    fn published_count(&self) -> u64 {
        0
    }

    /// Transactions this step failed to publish.
    fn failed_count(&self) -> u64 {
        0
    }
}

/// Ordered action chain with a running expected total.
pub struct BatchWorkflow {
    actions: Vec<Box<dyn BatchWorkflowAction>>,
    expected_total: u64,
}

impl BatchWorkflow {
    /// Create a workflow expecting `expected_total` transactions.
    pub fn new(actions: Vec<Box<dyn BatchWorkflowAction>>, expected_total: u64) -> Self {
        Self {
            actions,
            expected_total,
        }
    }

    /// Run every action in order against `context`, stopping at the first
    /// that drops the transaction.
    pub async fn execute(
        &mut self,
        context: &mut BatchWorkflowContext,
    ) -> Result<bool, ResendError> {
        context.expected_total = self.expected_total;

        let mut dropped_by = None;
        for action in self.actions.iter_mut() {
            if !action.execute(context).await? {
                dropped_by = Some(action.name());
                break;
            }
        }

        let Some(step) = dropped_by else {
            return Ok(true);
        };

        trace!(
            "[pr-02] transaction {} dropped by {}",
            context.encrypted_transaction.hash,
            step
        );
        self.expected_total = self.expected_total.saturating_sub(1);
        context.expected_total = self.expected_total;
        for action in self.actions.iter_mut() {
            action.check_outstanding(context).await;
        }
        Ok(false)
    }

    /// Flush anything still buffered.
    pub async fn finish(&mut self) {
        for action in self.actions.iter_mut() {
            action.flush().await;
        }
    }

    /// Transactions published so far.
    pub fn published_count(&self) -> u64 {
        self.actions.iter().map(|a| a.published_count()).sum()
    }

    /// Transactions that failed to publish so far.
    pub fn failed_count(&self) -> u64 {
        self.actions.iter().map(|a| a.failed_count()).sum()
    }

    /// Number of actions in the chain.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
