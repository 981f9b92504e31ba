// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared application state for the REST handlers.

use std::sync::Arc;

use crate::gateway::FabricGateway;
use crate::secrets::SecretStore;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<FabricGateway>,
    /// Secret store handle kept for the readiness probe.
    pub secrets: Arc<dyn SecretStore>,
}

impl AppState {
    pub fn new(gateway: FabricGateway, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            secrets,
        }
    }
}
