//! # Remote Enclave Client
//!
//! [`Enclave`] backed by an enclave service reached over HTTP.
//!
//! | Call | Method | Path |
//! |------|--------|------|
//! | status | GET | `ping` |
//! | public keys | GET | `public` |
//! | decrypt | POST | `unencrypt` |
//! | new recipient box | POST | `addRecipient` |
//!
//! Keys and byte strings travel hex encoded.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared_types::{EncodedPayload, Enclave, EnclaveError, PublicKey, RecipientBox, ServiceStatus};
use tracing::warn;

use crate::adapters::http::endpoint;

/// Body of `unencrypt` and `addRecipient`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnclavePayloadRequest {
    /// Payload to open or extend.
    pub payload: EncodedPayload,
    /// Hex key: the decrypting key, or the new recipient.
    pub provided_key: String,
}

/// Hex encoded byte response.
#[derive(Debug, Serialize, Deserialize)]
pub struct EnclaveBytes {
    /// Hex data.
    pub data: String,
}

/// HTTP enclave client.
pub struct HttpEnclaveClient {
    client: Client,
    base_url: String,
}

impl HttpEnclaveClient {
    /// Create a client for the enclave at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    async fn post_bytes(
        &self,
        path: &str,
        payload: &EncodedPayload,
        key: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        let request = EnclavePayloadRequest {
            payload: payload.clone(),
            provided_key: key.to_hex(),
        };
        let response = self
            .client
            .post(endpoint(&self.base_url, path))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(EnclaveError::DecryptionFailed(*key));
            }
            status => {
                return Err(EnclaveError::Remote(format!("{} returned {}", path, status)));
            }
        }

        let body: EnclaveBytes = response
            .json()
            .await
            .map_err(|e| EnclaveError::Remote(format!("malformed {} response: {}", path, e)))?;
        hex::decode(&body.data)
            .map_err(|e| EnclaveError::Remote(format!("malformed {} response: {}", path, e)))
    }
}

fn transport_error(err: reqwest::Error) -> EnclaveError {
    if err.is_connect() || err.is_timeout() {
        EnclaveError::NotAvailable
    } else {
        EnclaveError::Remote(err.to_string())
    }
}

#[async_trait]
impl Enclave for HttpEnclaveClient {
    async fn status(&self) -> ServiceStatus {
        match self.client.get(endpoint(&self.base_url, "ping")).send().await {
            Ok(response) if response.status().is_success() => ServiceStatus::Started,
            Ok(response) => {
                warn!("Enclave ping returned {}", response.status());
                ServiceStatus::Stopped
            }
            Err(err) => {
                warn!("Enclave unreachable: {}", err);
                ServiceStatus::Stopped
            }
        }
    }

    async fn public_keys(&self) -> Result<Vec<PublicKey>, EnclaveError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "public"))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(EnclaveError::Remote(format!(
                "public returned {}",
                response.status()
            )));
        }

        let keys: Vec<String> = response
            .json()
            .await
            .map_err(|e| EnclaveError::Remote(format!("malformed key list: {}", e)))?;
        keys.iter()
            .map(|key| PublicKey::from_hex(key).map_err(|e| EnclaveError::Remote(e.to_string())))
            .collect()
    }

    async fn unencrypt_transaction(
        &self,
        payload: &EncodedPayload,
        key: &PublicKey,
    ) -> Result<Vec<u8>, EnclaveError> {
        self.post_bytes("unencrypt", payload, key).await
    }

    async fn create_new_recipient_box(
        &self,
        payload: &EncodedPayload,
        recipient: &PublicKey,
    ) -> Result<RecipientBox, EnclaveError> {
        self.post_bytes("addRecipient", payload, recipient)
            .await
            .map(RecipientBox::from)
    }
}
