//! # Transport Factory
//!
//! Resolves every remote collaborator from [`TransportKind`].

use std::sync::Arc;

use pr_02_resend::{PayloadPublisher, RecoveryClient};
use shared_types::{Discovery, Enclave};
use thiserror::Error;
use tracing::info;

use crate::adapters::enclave::HttpEnclaveClient;
use crate::adapters::http::{build_client, HttpPeerClient};
use crate::adapters::offline::{OfflineEnclave, OfflinePeerClient};
use crate::container::config::{RelayConfig, TransportKind};

/// Transport construction errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP client could not be built.
    #[error("Cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// HTTP transport without an enclave URL.
    #[error("HTTP transport requires an enclave URL")]
    MissingEnclaveUrl,
}

/// Every remote collaborator the subsystems are wired against.
#[derive(Clone)]
pub struct Transports {
    /// Peer recovery calls.
    pub peers: Arc<dyn RecoveryClient>,
    /// Single payload delivery.
    pub payload_publisher: Arc<dyn PayloadPublisher>,
    /// Key holder.
    pub enclave: Arc<dyn Enclave>,
}

impl Transports {
    /// Offline stand-ins.
    pub fn offline() -> Self {
        let peers = Arc::new(OfflinePeerClient);
        Self {
            peers: peers.clone(),
            payload_publisher: peers,
            enclave: Arc::new(OfflineEnclave),
        }
    }

    /// HTTP clients for peers and the enclave.
    pub fn http(
        config: &RelayConfig,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Self, TransportError> {
        let enclave_url = config
            .enclave
            .url
            .clone()
            .ok_or(TransportError::MissingEnclaveUrl)?;
        let client = build_client(&config.transport)?;
        let peers = Arc::new(HttpPeerClient::new(client.clone(), discovery));

        Ok(Self {
            peers: peers.clone(),
            payload_publisher: peers,
            enclave: Arc::new(HttpEnclaveClient::new(client, enclave_url)),
        })
    }
}

/// Build the transports selected by `config.transport.kind`.
pub fn build_transports(
    config: &RelayConfig,
    discovery: Arc<dyn Discovery>,
) -> Result<Transports, TransportError> {
    info!("Using {:?} transport", config.transport.kind);
    match config.transport.kind {
        TransportKind::Http => Transports::http(config, discovery),
        TransportKind::Offline => Ok(Transports::offline()),
    }
}
