//! # HTTP Peer Client
//!
//! JSON-over-HTTP implementations of the peer-facing outbound ports.
//!
//! | Call | Method | Path |
//! |------|--------|------|
//! | batch resend request | POST | `{peer}/resendBatch` |
//! | legacy resend request | POST | `{peer}/resend` |
//! | push batch | POST | `{peer}/pushBatch` |
//! | push payload | POST | `{peer}/push` |
//! | push privacy group | POST | `{peer}/pushPrivacyGroup` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pr_02_resend::{
    PayloadPublisher, PrivacyGroupPublisher, PushBatchRequest, RecoveryClient, ResendBatchRequest,
    ResendBatchResponse, ResendRequest, ResendResponse,
};
use relay_telemetry::{metric_inc, HistogramTimer, REMOTE_CALLS, REMOTE_CALL_DURATION};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{normalize_url, Discovery, EncodedPayload, PublicKey, PublishError};
use tracing::debug;

use crate::container::config::TransportConfig;

/// Build the shared reqwest client with the configured timeouts.
pub fn build_client(config: &TransportConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
}

/// Join a node base URL and an endpoint path.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", normalize_url(base), path)
}

fn send_error(url: &str, err: reqwest::Error) -> PublishError {
    if err.is_connect() || err.is_timeout() {
        PublishError::NodeOffline {
            url: url.to_string(),
        }
    } else {
        PublishError::Rejected {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PublishError::Rejected {
            url: url.to_string(),
            reason: format!("status {}", status),
        })
    }
}

/// Peer client over HTTP.
///
/// Payload publishes resolve the recipient's node through discovery.
pub struct HttpPeerClient {
    client: Client,
    discovery: Arc<dyn Discovery>,
}

impl HttpPeerClient {
    /// Create a client.
    pub fn new(client: Client, discovery: Arc<dyn Discovery>) -> Self {
        Self { client, discovery }
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<Response, PublishError> {
        let _timer = HistogramTimer::new(&REMOTE_CALL_DURATION);
        debug!("POST {}", url);

        let result = match self.client.post(url).json(body).send().await {
            Ok(response) => check_status(url, response),
            Err(err) => Err(send_error(url, err)),
        };
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metric_inc!(REMOTE_CALLS, &[operation, outcome]);
        result
    }

    async fn post_for<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> Result<R, PublishError> {
        let response = self.post(operation, url, body).await?;
        response.json::<R>().await.map_err(|err| PublishError::Rejected {
            url: url.to_string(),
            reason: format!("malformed response: {}", err),
        })
    }

    fn node_url(&self, recipient: &PublicKey) -> Result<String, PublishError> {
        Ok(self.discovery.remote_node_info(recipient)?.url)
    }
}

#[async_trait]
impl RecoveryClient for HttpPeerClient {
    async fn make_batch_resend_request(
        &self,
        url: &str,
        request: ResendBatchRequest,
    ) -> Result<ResendBatchResponse, PublishError> {
        self.post_for("resend_batch", &endpoint(url, "resendBatch"), &request)
            .await
    }

    async fn make_resend_request(
        &self,
        url: &str,
        request: ResendRequest,
    ) -> Result<ResendResponse, PublishError> {
        self.post_for("resend", &endpoint(url, "resend"), &request).await
    }

    async fn push_batch(&self, url: &str, request: PushBatchRequest) -> Result<(), PublishError> {
        self.post("push_batch", &endpoint(url, "pushBatch"), &request)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PayloadPublisher for HttpPeerClient {
    async fn publish_payload(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<(), PublishError> {
        let url = self.node_url(recipient)?;
        self.post("push", &endpoint(&url, "push"), payload)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PrivacyGroupPublisher for HttpPeerClient {
    async fn publish_privacy_group(
        &self,
        data: &[u8],
        recipient: &PublicKey,
    ) -> Result<(), PublishError> {
        let url = self.node_url(recipient)?;
        self.post(
            "push_privacy_group",
            &endpoint(&url, "pushPrivacyGroup"),
            &hex::encode(data),
        )
        .await
        .map(|_| ())
    }
}
