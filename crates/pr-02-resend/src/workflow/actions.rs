//! # Workflow Actions
//!
//! The filtering and preparation steps of the batch workflow.

use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{
    normalize_url, Discovery, Enclave, EncodedPayload, PayloadError, PrivacyMode, Recipient,
    ServiceStatus,
};
use tracing::{debug, warn};

use crate::domain::{BatchWorkflowContext, ResendError};
use crate::workflow::BatchWorkflowAction;

/// Aborts the run unless the enclave is started.
pub struct ValidateEnclaveStatus {
    enclave: Arc<dyn Enclave>,
}

impl ValidateEnclaveStatus {
    /// Create the step.
    pub fn new(enclave: Arc<dyn Enclave>) -> Self {
        Self { enclave }
    }
}

#[async_trait]
impl BatchWorkflowAction for ValidateEnclaveStatus {
    fn name(&self) -> &'static str {
        "ValidateEnclaveStatus"
    }

    async fn execute(&mut self, _context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        match self.enclave.status().await {
            ServiceStatus::Started => Ok(true),
            ServiceStatus::Stopped => Err(ResendError::EnclaveUnavailable),
        }
    }
}

/// Keeps transactions the requesting key sent or received.
pub struct FilterPayload {
    standard_private_only: bool,
}

impl FilterPayload {
    /// Filter for the batch workflow.
    pub fn new() -> Self {
        Self {
            standard_private_only: false,
        }
    }

    /// Filter for the legacy workflow, which also drops enhanced privacy
    /// transactions.
    pub fn standard_private_only() -> Self {
        Self {
            standard_private_only: true,
        }
    }
}

impl Default for FilterPayload {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchWorkflowAction for FilterPayload {
    fn name(&self) -> &'static str {
        "FilterPayload"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let payload = &context.encoded_payload;
        if self.standard_private_only && payload.privacy_mode != PrivacyMode::StandardPrivate {
            return Ok(false);
        }
        let target = &context.recipient_key;
        Ok(&payload.sender_key == target || payload.recipient_keys.contains(target))
    }
}

/// Strips the payload down to what the requesting key may see.
///
/// A recipient gets its own view. A sender gets one view per boxed recipient,
/// or one keyless payload per box when no recipient keys were recorded.
#[derive(Default)]
pub struct PreparePayloadForRecipient;

impl PreparePayloadForRecipient {
    /// Create the step.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BatchWorkflowAction for PreparePayloadForRecipient {
    fn name(&self) -> &'static str {
        "PreparePayloadForRecipient"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let payload = &context.encoded_payload;

        if !context.target_is_sender() {
            return match payload.for_recipient(&context.recipient_key) {
                Ok(view) => {
                    context.payloads_to_publish = vec![view];
                    Ok(true)
                }
                Err(PayloadError::MissingRecipientBox(key)) => {
                    warn!(
                        "[pr-02] no box for {} in {}, skipping",
                        key, context.encrypted_transaction.hash
                    );
                    Ok(false)
                }
                Err(err) => Err(err.into()),
            };
        }

        let views = if payload.recipient_keys.is_empty() {
            payload
                .recipient_boxes
                .iter()
                .map(|rbox| {
                    payload
                        .clone()
                        .with_recipient_keys(Vec::new())
                        .with_recipient_boxes(vec![rbox.clone()])
                })
                .collect()
        } else {
            payload
                .boxed_recipients()
                .iter()
                .map(|key| payload.for_recipient(key))
                .collect::<Result<Vec<_>, _>>()?
        };

        context.payloads_to_publish = views;
        Ok(true)
    }
}

/// Finds the local key that opens each keyless payload.
pub struct SearchRecipientKeyForPayload {
    enclave: Arc<dyn Enclave>,
}

impl SearchRecipientKeyForPayload {
    /// Create the step.
    pub fn new(enclave: Arc<dyn Enclave>) -> Self {
        Self { enclave }
    }

    async fn find_key(
        &self,
        payload: &EncodedPayload,
    ) -> Result<Option<EncodedPayload>, ResendError> {
        for key in self.enclave.public_keys().await? {
            match self.enclave.unencrypt_transaction(payload, &key).await {
                Ok(_) => return Ok(Some(payload.clone().with_recipient_keys(vec![key]))),
                Err(err) => debug!("[pr-02] key {} does not open payload: {}", key, err),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BatchWorkflowAction for SearchRecipientKeyForPayload {
    fn name(&self) -> &'static str {
        "SearchRecipientKeyForPayload"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let mut resolved = Vec::with_capacity(context.payloads_to_publish.len());

        for payload in std::mem::take(&mut context.payloads_to_publish) {
            if !payload.recipient_keys.is_empty() {
                resolved.push(payload);
                continue;
            }
            match self.find_key(&payload).await? {
                Some(keyed) => resolved.push(keyed),
                None => {
                    warn!(
                        "[pr-02] no local key opens a box of {}",
                        context.encrypted_transaction.hash
                    );
                    return Err(ResendError::RecipientKeyNotFound(
                        context.encrypted_transaction.hash.clone(),
                    ));
                }
            }
        }

        context.payloads_to_publish = resolved;
        Ok(true)
    }
}

/// Resolves the requesting key's node url.
pub struct FindRecipientFromPartyInfo {
    discovery: Arc<dyn Discovery>,
}

impl FindRecipientFromPartyInfo {
    /// Create the step.
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl BatchWorkflowAction for FindRecipientFromPartyInfo {
    fn name(&self) -> &'static str {
        "FindRecipientFromPartyInfo"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        match self.discovery.remote_node_info(&context.recipient_key) {
            Ok(node) => {
                context.recipient = Some(Recipient::new(context.recipient_key, node.url));
                Ok(true)
            }
            Err(err) => {
                debug!("[pr-02] {}", err);
                Ok(false)
            }
        }
    }
}

/// Drops deliveries addressed to this node.
pub struct SenderIsNotRecipient {
    discovery: Arc<dyn Discovery>,
}

impl SenderIsNotRecipient {
    /// Create the step.
    pub fn new(discovery: Arc<dyn Discovery>) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl BatchWorkflowAction for SenderIsNotRecipient {
    fn name(&self) -> &'static str {
        "SenderIsNotRecipient"
    }

    async fn execute(&mut self, context: &mut BatchWorkflowContext) -> Result<bool, ResendError> {
        let current = self.discovery.current();
        let own_url = context
            .recipient
            .as_ref()
            .is_some_and(|r| normalize_url(&r.url) == normalize_url(&current.url));

        Ok(!own_url && !current.hosts(&context.recipient_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::testing::{sample_key, sample_payload, sample_payload_for, FakeEnclave};
    use shared_types::{EncryptedTransaction, NodeInfo, PublicKey, RecipientBox, StaticDiscovery};
    use std::collections::BTreeSet;

    fn context(payload: EncodedPayload, target: PublicKey) -> BatchWorkflowContext {
        BatchWorkflowContext::new(EncryptedTransaction::new(payload), target, 10)
    }

    fn discovery() -> Arc<StaticDiscovery> {
        let current = NodeInfo::new(
            "http://me",
            vec![Recipient::new(sample_key(1), "http://me")],
            BTreeSet::new(),
        );
        let peer = NodeInfo::new(
            "http://peer",
            vec![Recipient::new(sample_key(2), "http://peer")],
            BTreeSet::new(),
        );
        Arc::new(StaticDiscovery::new(current, vec![peer]))
    }

    #[tokio::test]
    async fn test_validate_enclave_status() {
        let enclave = Arc::new(FakeEnclave::new(vec![]));
        let mut step = ValidateEnclaveStatus::new(enclave.clone());
        let mut ctx = context(sample_payload(sample_key(1), b"a"), sample_key(2));

        assert!(step.execute(&mut ctx).await.unwrap());
        enclave.set_available(false);
        assert_eq!(
            step.execute(&mut ctx).await,
            Err(ResendError::EnclaveUnavailable)
        );
    }

    #[tokio::test]
    async fn test_filter_payload() {
        let sender = sample_key(1);
        let payload = sample_payload_for(
            sender,
            b"a",
            &[sample_key(2)],
            PrivacyMode::PartyProtection,
        );
        let mut filter = FilterPayload::new();

        assert!(filter.execute(&mut context(payload.clone(), sample_key(2))).await.unwrap());
        assert!(filter.execute(&mut context(payload.clone(), sender)).await.unwrap());
        assert!(!filter.execute(&mut context(payload.clone(), sample_key(9))).await.unwrap());

        let mut legacy = FilterPayload::standard_private_only();
        assert!(!legacy.execute(&mut context(payload, sample_key(2))).await.unwrap());
    }

    #[tokio::test]
    async fn test_prepare_for_recipient() {
        let payload = sample_payload_for(
            sample_key(1),
            b"a",
            &[sample_key(2), sample_key(3)],
            PrivacyMode::StandardPrivate,
        );
        let mut ctx = context(payload, sample_key(3));

        assert!(PreparePayloadForRecipient::new().execute(&mut ctx).await.unwrap());
        assert_eq!(ctx.payloads_to_publish.len(), 1);
        assert_eq!(ctx.payloads_to_publish[0].recipient_keys, vec![sample_key(3)]);
    }

    #[tokio::test]
    async fn test_prepare_skips_recipient_without_box() {
        let (a, b, c) = (sample_key(2), sample_key(3), sample_key(4));
        let payload = sample_payload(sample_key(1), b"a")
            .with_recipient_keys(vec![a, b, c])
            .with_recipient_box(FakeEnclave::box_for(&a))
            .with_recipient_box(FakeEnclave::box_for(&b));
        let mut ctx = context(payload, c);

        assert!(!PreparePayloadForRecipient::new().execute(&mut ctx).await.unwrap());
        assert!(ctx.payloads_to_publish.is_empty());
    }

    #[tokio::test]
    async fn test_prepare_rejects_unknown_recipient() {
        let payload =
            sample_payload_for(sample_key(1), b"a", &[sample_key(2)], PrivacyMode::StandardPrivate);
        let mut ctx = context(payload, sample_key(5));

        assert!(PreparePayloadForRecipient::new().execute(&mut ctx).await.is_err());
        assert!(ctx.payloads_to_publish.is_empty());
    }

    #[tokio::test]
    async fn test_prepare_for_sender_splits_boxes() {
        let payload = sample_payload_for(
            sample_key(1),
            b"a",
            &[sample_key(2), sample_key(3)],
            PrivacyMode::StandardPrivate,
        );
        let mut ctx = context(payload, sample_key(1));

        assert!(PreparePayloadForRecipient::new().execute(&mut ctx).await.unwrap());
        assert_eq!(ctx.payloads_to_publish.len(), 2);
    }

    #[tokio::test]
    async fn test_prepare_for_sender_psv_only_boxed_keys() {
        let payload = sample_payload(sample_key(1), b"a")
            .with_privacy_mode(PrivacyMode::PrivateStateValidation)
            .with_recipient_keys(vec![sample_key(2), sample_key(3)])
            .with_recipient_box(FakeEnclave::box_for(&sample_key(2)));
        let mut ctx = context(payload, sample_key(1));

        assert!(PreparePayloadForRecipient::new().execute(&mut ctx).await.unwrap());
        assert_eq!(ctx.payloads_to_publish.len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_for_sender_without_keys() {
        let payload = sample_payload(sample_key(1), b"a")
            .with_recipient_box(RecipientBox(b"box1".to_vec()))
            .with_recipient_box(RecipientBox(b"box2".to_vec()));
        let mut ctx = context(payload, sample_key(1));

        assert!(PreparePayloadForRecipient::new().execute(&mut ctx).await.unwrap());
        assert_eq!(ctx.payloads_to_publish.len(), 2);
        for view in &ctx.payloads_to_publish {
            assert!(view.recipient_keys.is_empty());
            assert_eq!(view.recipient_boxes.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_search_recipient_key() {
        let (r1, r2) = (sample_key(2), sample_key(3));
        let enclave = Arc::new(FakeEnclave::new(vec![r1, r2]));
        let keyless = |owner: &PublicKey| {
            sample_payload(sample_key(1), b"a").with_recipient_box(FakeEnclave::box_for(owner))
        };
        let mut ctx = context(sample_payload(sample_key(1), b"a"), sample_key(1))
            .with_payloads_to_publish(vec![keyless(&r1), keyless(&r2)]);

        let mut step = SearchRecipientKeyForPayload::new(enclave);
        assert!(step.execute(&mut ctx).await.unwrap());

        let keys: Vec<_> = ctx
            .payloads_to_publish
            .iter()
            .flat_map(|p| p.recipient_keys.clone())
            .collect();
        assert_eq!(keys, vec![r1, r2]);
    }

    #[tokio::test]
    async fn test_search_recipient_key_not_found() {
        let enclave = Arc::new(FakeEnclave::new(vec![sample_key(5)]));
        let payload = sample_payload(sample_key(1), b"a")
            .with_recipient_box(FakeEnclave::box_for(&sample_key(2)));
        let mut ctx =
            context(payload.clone(), sample_key(1)).with_payloads_to_publish(vec![payload]);

        let result = SearchRecipientKeyForPayload::new(enclave).execute(&mut ctx).await;
        assert!(matches!(result, Err(ResendError::RecipientKeyNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_recipient_from_party_info() {
        let mut step = FindRecipientFromPartyInfo::new(discovery());
        let payload = sample_payload(sample_key(1), b"a");

        let mut ctx = context(payload.clone(), sample_key(2));
        assert!(step.execute(&mut ctx).await.unwrap());
        assert_eq!(ctx.recipient.unwrap().url, "http://peer");

        let mut unknown = context(payload, sample_key(9));
        assert!(!step.execute(&mut unknown).await.unwrap());
    }

    #[tokio::test]
    async fn test_sender_is_not_recipient() {
        let mut step = SenderIsNotRecipient::new(discovery());
        let payload = sample_payload(sample_key(1), b"a");

        let mut remote = context(payload.clone(), sample_key(2));
        remote.recipient = Some(Recipient::new(sample_key(2), "http://peer"));
        assert!(step.execute(&mut remote).await.unwrap());

        let mut local = context(payload, sample_key(1));
        local.recipient = Some(Recipient::new(sample_key(1), "http://me/"));
        assert!(!step.execute(&mut local).await.unwrap());
    }
}
