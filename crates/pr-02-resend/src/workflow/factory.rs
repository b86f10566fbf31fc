//! # Workflow Factories
//!
//! Build a fresh action chain for each resend run.

use std::sync::Arc;

use shared_types::{Discovery, Enclave};

use crate::adapters::AsyncBatchPayloadPublisher;
use crate::ports::ResendBatchPublisher;
use crate::workflow::{
    BatchWorkflow, BatchWorkflowAction, EncodedPayloadPublisher, FilterPayload,
    FindRecipientFromPartyInfo, PreparePayloadForRecipient, SearchRecipientKeyForPayload,
    SenderIsNotRecipient, StandardPayloadPublisher, ValidateEnclaveStatus,
};

/// Builds the batch resend workflow.
pub struct BatchWorkflowFactory {
    enclave: Arc<dyn Enclave>,
    discovery: Arc<dyn Discovery>,
    publisher: Arc<dyn ResendBatchPublisher>,
}

impl BatchWorkflowFactory {
    /// Create a factory.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        discovery: Arc<dyn Discovery>,
        publisher: Arc<dyn ResendBatchPublisher>,
    ) -> Self {
        Self {
            enclave,
            discovery,
            publisher,
        }
    }

    /// Workflow for a run over `transaction_count` stored transactions.
    pub fn create(&self, transaction_count: u64) -> BatchWorkflow {
        let mut actions: Vec<Box<dyn BatchWorkflowAction>> = Vec::with_capacity(7);
        actions.push(Box::new(ValidateEnclaveStatus::new(self.enclave.clone())));
        actions.push(Box::new(FilterPayload::new()));
        actions.push(Box::new(PreparePayloadForRecipient::new()));
        actions.push(Box::new(SearchRecipientKeyForPayload::new(self.enclave.clone())));
        actions.push(Box::new(FindRecipientFromPartyInfo::new(self.discovery.clone())));
        actions.push(Box::new(SenderIsNotRecipient::new(self.discovery.clone())));
        actions.push(Box::new(EncodedPayloadPublisher::new(
            self.publisher.clone(),
            self.discovery.clone(),
        )));
        BatchWorkflow::new(actions, transaction_count)
    }
}

/// Builds the legacy resend workflow: standard private transactions only,
/// published one payload at a time.
pub struct LegacyWorkflowFactory {
    enclave: Arc<dyn Enclave>,
    discovery: Arc<dyn Discovery>,
    publisher: Arc<AsyncBatchPayloadPublisher>,
}

impl LegacyWorkflowFactory {
    /// Create a factory.
    pub fn new(
        enclave: Arc<dyn Enclave>,
        discovery: Arc<dyn Discovery>,
        publisher: Arc<AsyncBatchPayloadPublisher>,
    ) -> Self {
        Self {
            enclave,
            discovery,
            publisher,
        }
    }

    /// Workflow for a run over `transaction_count` stored transactions.
    pub fn create(&self, transaction_count: u64) -> BatchWorkflow {
        let mut actions: Vec<Box<dyn BatchWorkflowAction>> = Vec::with_capacity(7);
        actions.push(Box::new(ValidateEnclaveStatus::new(self.enclave.clone())));
        actions.push(Box::new(FilterPayload::standard_private_only()));
        actions.push(Box::new(PreparePayloadForRecipient::new()));
        actions.push(Box::new(SearchRecipientKeyForPayload::new(self.enclave.clone())));
        actions.push(Box::new(FindRecipientFromPartyInfo::new(self.discovery.clone())));
        actions.push(Box::new(SenderIsNotRecipient::new(self.discovery.clone())));
        actions.push(Box::new(StandardPayloadPublisher::new(
            self.publisher.clone(),
            self.discovery.clone(),
        )));
        BatchWorkflow::new(actions, transaction_count)
    }
}
