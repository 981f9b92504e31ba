// SPDX-License-Identifier: AGPL-3.0-or-later

//! Channel lifecycle.
//!
//! A channel is connected at most once per process; every later `ensure`
//! call returns the cached handle. Initialization failure leaves nothing
//! cached, so the next call retries cleanly. The network TLS trust bundle
//! is read from disk once and shared by every endpoint.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::AmbConfig;
use crate::error::GatewayError;
use crate::fabric::{Endpoint, FabricChannel, FabricNetwork};

/// Idempotent access to the configured channel.
pub struct ChannelManager {
    network: Arc<dyn FabricNetwork>,
    config: Arc<AmbConfig>,
    channel: OnceCell<Arc<dyn FabricChannel>>,
    tls_root: OnceCell<String>,
}

impl ChannelManager {
    pub fn new(network: Arc<dyn FabricNetwork>, config: Arc<AmbConfig>) -> Self {
        Self {
            network,
            config,
            channel: OnceCell::new(),
            tls_root: OnceCell::new(),
        }
    }

    /// TLS trust bundle for peer and orderer endpoints, read once.
    ///
    /// A missing bundle is tolerated (the dev backend ignores trust
    /// material); an unreadable one is an error.
    async fn tls_root(&self) -> Result<&str, GatewayError> {
        self.tls_root
            .get_or_try_init(|| async {
                let path = Path::new(&self.config.tls_cert_path);
                if !path.exists() {
                    warn!(path = %path.display(), "TLS trust bundle not found, endpoints get no trust material");
                    return Ok(String::new());
                }
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    GatewayError::Setup(format!(
                        "reading TLS trust bundle {}: {e}",
                        path.display()
                    ))
                })
            })
            .await
            .map(String::as_str)
    }

    /// Connect the configured channel, or return the already-connected one.
    ///
    /// Concurrent callers coalesce onto a single connection attempt.
    pub async fn ensure(&self) -> Result<Arc<dyn FabricChannel>, GatewayError> {
        self.channel
            .get_or_try_init(|| async {
                let tls_root = self.tls_root().await?.to_string();
                let peers: Vec<Endpoint> = self
                    .config
                    .peers
                    .iter()
                    .map(|p| Endpoint::new(&p.name, &p.url, &tls_root))
                    .collect();
                let orderer = Endpoint::new(
                    self.config.orderer_name(),
                    &self.config.orderer_url,
                    &tls_root,
                );

                info!(
                    channel = %self.config.channel_name,
                    peers = peers.len(),
                    "initializing channel"
                );
                let channel = self
                    .network
                    .connect_channel(&self.config.channel_name, &peers, &orderer)
                    .await?;
                Ok::<_, GatewayError>(channel)
            })
            .await
            .cloned()
    }

    /// The connected channel, if setup has run.
    pub fn current(&self) -> Option<Arc<dyn FabricChannel>> {
        self.channel.get().cloned()
    }
}
