// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gateway facade.
//!
//! Ties the enrollment state machine, the channel manager and the
//! transaction flows together behind one handle. The facade holds no
//! per-call mutable state; the acting identity is an explicit argument to
//! every transaction call.

use std::sync::Arc;

use tracing::info;

use crate::ca::{CertificateAuthority, EnrollmentManager};
use crate::channel::ChannelManager;
use crate::config::AmbConfig;
use crate::error::GatewayError;
use crate::fabric::{CommitHandle, FabricChannel, FabricNetwork};
use crate::identity::{FabricUser, IdentityRepository};
use crate::secrets::SecretStore;
use crate::transaction;

/// Client-side gateway to one Managed Blockchain member.
pub struct FabricGateway {
    config: Arc<AmbConfig>,
    enrollment: EnrollmentManager,
    channels: ChannelManager,
}

impl FabricGateway {
    pub fn new(
        config: Arc<AmbConfig>,
        store: Arc<dyn SecretStore>,
        ca: Arc<dyn CertificateAuthority>,
        network: Arc<dyn FabricNetwork>,
    ) -> Self {
        let enrollment =
            EnrollmentManager::new(ca, IdentityRepository::new(store), config.clone());
        let channels = ChannelManager::new(network, config.clone());
        Self {
            config,
            enrollment,
            channels,
        }
    }

    pub fn config(&self) -> &Arc<AmbConfig> {
        &self.config
    }

    /// Connect the configured channel; safe to call repeatedly.
    pub async fn setup(&self) -> Result<(), GatewayError> {
        self.channels.ensure().await?;
        Ok(())
    }

    /// Whether the channel has been connected.
    pub fn is_ready(&self) -> bool {
        self.channels.current().is_some()
    }

    /// Enroll the configured application identity, registering it with the
    /// CA on first use.
    pub async fn enroll_app_user(&self) -> Result<FabricUser, GatewayError> {
        self.enrollment
            .ensure_user(&self.config.app_user, &self.config.app_user_secret)
            .await
    }

    /// Context for an already-enrolled identity; never enrolls.
    pub async fn user_context(&self, user_id: &str) -> Result<FabricUser, GatewayError> {
        self.enrollment.user_context(user_id).await
    }

    fn channel(&self) -> Result<Arc<dyn FabricChannel>, GatewayError> {
        self.channels.current().ok_or(GatewayError::NotReady)
    }

    /// Evaluate a single-argument chaincode function on the query path.
    pub async fn query_chaincode(
        &self,
        context: &FabricUser,
        chaincode: &str,
        function: &str,
        arg: &str,
    ) -> Result<String, GatewayError> {
        let channel = self.channel()?;
        transaction::query_chaincode(
            &channel,
            context,
            chaincode,
            function,
            arg,
            self.config.proposal_wait,
            self.config.query_aggregation,
        )
        .await
    }

    /// Submit a chaincode invocation for endorsement and ordering.
    pub async fn invoke_chaincode(
        &self,
        context: &FabricUser,
        chaincode: &str,
        function: &str,
        args: Vec<String>,
    ) -> Result<CommitHandle, GatewayError> {
        let channel = self.channel()?;
        let handle = transaction::invoke_chaincode(
            &channel,
            context,
            chaincode,
            function,
            args,
            self.config.proposal_wait,
        )
        .await?;
        info!(
            user_id = %context.user_id(),
            transaction_id = %handle.transaction_id(),
            "invocation accepted for ordering"
        );
        Ok(handle)
    }
}
