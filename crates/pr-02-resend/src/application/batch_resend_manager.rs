//! # Batch Resend Manager
//!
//! Answers a peer's "resend everything for key K" by walking the canonical
//! store through the batch workflow, and records batches peers push to us.

use std::sync::Arc;

use async_trait::async_trait;
use pr_01_payload_merge::calculate_batch_count;
use shared_types::{
    Discovery, Enclave, EncryptedTransactionStore, StagingTransaction, StagingTransactionStore,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ResendConfig;
use crate::domain::{
    BatchWorkflowContext, PushBatchRequest, ResendBatchRequest, ResendBatchResponse, ResendError,
};
use crate::ports::{BatchResendManager, ResendBatchPublisher};
use crate::workflow::BatchWorkflowFactory;

/// [`BatchResendManager`] over the canonical store and staging area.
pub struct BatchResendManagerImpl {
    config: ResendConfig,
    encrypted_store: Arc<dyn EncryptedTransactionStore>,
    staging_store: Arc<dyn StagingTransactionStore>,
    workflows: BatchWorkflowFactory,
    store_lock: Mutex<()>,
}

impl BatchResendManagerImpl {
    /// Create a manager.
    pub fn new(
        config: ResendConfig,
        enclave: Arc<dyn Enclave>,
        discovery: Arc<dyn Discovery>,
        encrypted_store: Arc<dyn EncryptedTransactionStore>,
        staging_store: Arc<dyn StagingTransactionStore>,
        publisher: Arc<dyn ResendBatchPublisher>,
    ) -> Self {
        Self {
            config,
            encrypted_store,
            staging_store,
            workflows: BatchWorkflowFactory::new(enclave, discovery, publisher),
            store_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl BatchResendManager for BatchResendManagerImpl {
    async fn resend_batch(
        &self,
        request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, ResendError> {
        let batch_size = self.config.batch_size_for(request.batch_size);
        let page_size = self.config.fetch_size.max(1);
        let transaction_count = self.encrypted_store.transaction_count()?;
        let pages = calculate_batch_count(page_size as u64, transaction_count);

        info!(
            "[pr-02] resending {} transactions for {} (batch size {}, {} pages)",
            transaction_count, request.public_key, batch_size, pages
        );

        let mut workflow = self.workflows.create(transaction_count);
        for page in 0..pages {
            let offset = page * page_size as u64;
            let rows = self.encrypted_store.retrieve_transactions(offset, page_size)?;
            debug!("[pr-02] processing page {} ({} rows)", page, rows.len());

            for transaction in rows {
                let mut context =
                    BatchWorkflowContext::new(transaction, request.public_key, batch_size);
                workflow.execute(&mut context).await?;
            }
        }
        workflow.finish().await;

        let total = workflow.published_count();
        info!(
            "[pr-02] resent {} transactions for {} ({} failed)",
            total,
            request.public_key,
            workflow.failed_count()
        );
        Ok(ResendBatchResponse { total })
    }

    async fn store_resend_batch(&self, request: PushBatchRequest) -> Result<(), ResendError> {
        let _guard = self.store_lock.lock().await;
        let count = request.payloads.len();
        for payload in request.payloads {
            self.staging_store.save(StagingTransaction::new(payload))?;
        }
        debug!("[pr-02] staged {} pushed payloads", count);
        Ok(())
    }

    async fn cleanup_staging_area(&self) -> Result<(), ResendError> {
        let _guard = self.store_lock.lock().await;
        self.staging_store.delete_all()?;
        info!("[pr-02] staging area cleared");
        Ok(())
    }
}
