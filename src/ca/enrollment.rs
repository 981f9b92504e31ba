// SPDX-License-Identifier: AGPL-3.0-or-later

//! Enrollment lifecycle state machine.
//!
//! Every identity resolves the same way: look in the secret store first and
//! reconstruct the user from persisted credentials; only on a miss go to the
//! CA. Re-enrolling an identity that already has credentials is never done;
//! the CA would reject it or mint a confusingly overlapping identity.
//!
//! The admin is the bootstrap case (direct enroll with the shared admin
//! secret); every other user needs an enrolled admin as registrar, which
//! this manager resolves recursively, exactly one level deep, since the
//! admin needs no registrar of its own.

use std::sync::Arc;

use tracing::{error, info};

use super::{CertificateAuthority, RegistrationRequest};
use crate::config::AmbConfig;
use crate::error::GatewayError;
use crate::identity::{FabricUser, IdentityRepository};

/// Resolves identities to enrolled users, enrolling on first use.
pub struct EnrollmentManager {
    ca: Arc<dyn CertificateAuthority>,
    identities: IdentityRepository,
    config: Arc<AmbConfig>,
}

impl EnrollmentManager {
    pub fn new(
        ca: Arc<dyn CertificateAuthority>,
        identities: IdentityRepository,
        config: Arc<AmbConfig>,
    ) -> Self {
        Self {
            ca,
            identities,
            config,
        }
    }

    fn user(&self, user_id: &str, enrollment: crate::identity::Enrollment) -> FabricUser {
        FabricUser::new(
            user_id,
            &self.config.member_name,
            &self.config.member_id,
            enrollment,
        )
    }

    /// Resolve the admin identity, enrolling it on first use.
    ///
    /// The fast path reconstructs the admin purely from the secret store
    /// with zero CA calls.
    pub async fn admin(&self) -> Result<FabricUser, GatewayError> {
        let admin_id = &self.config.admin_user;
        let org = &self.config.member_name;

        if let Some(enrollment) = self.identities.load(admin_id, org).await? {
            info!("admin user context reconstructed from secret store");
            return Ok(self.user(admin_id, enrollment));
        }

        info!("no admin credentials in secret store, enrolling admin");
        let enrollment = self
            .ca
            .enroll(admin_id, &self.config.admin_secret)
            .await
            .map_err(|e| {
                error!(error = %e, "admin enrollment failed");
                e
            })?;

        self.identities.save(admin_id, org, &enrollment).await?;
        info!("admin successfully enrolled and credentials saved");
        Ok(self.user(admin_id, enrollment))
    }

    /// Resolve a user identity, registering and enrolling it on first use.
    ///
    /// An already-enrolled user comes straight from the store; otherwise the
    /// admin is resolved first (it is the registrar), the user is registered
    /// with the CA, enrolled with the returned secret, and persisted.
    pub async fn ensure_user(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<FabricUser, GatewayError> {
        let org = &self.config.member_name;

        if let Some(enrollment) = self.identities.load(user_id, org).await? {
            info!(user_id, "user is already enrolled");
            return Ok(self.user(user_id, enrollment));
        }

        info!(user_id, "enrollment not found for user, enrolling user");
        let admin = self.admin().await?;

        let request = RegistrationRequest::new(user_id, org.clone(), secret);
        let enrollment_secret = self.ca.register(&request, &admin).await.map_err(|e| {
            error!(user_id, error = %e, "user registration failed");
            e
        })?;

        let enrollment = self
            .ca
            .enroll(user_id, &enrollment_secret)
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "user enrollment failed");
                e
            })?;

        self.identities.save(user_id, org, &enrollment).await?;
        info!(user_id, "user successfully enrolled and credentials saved");
        Ok(self.user(user_id, enrollment))
    }

    /// Resolve an identity that must already be enrolled.
    ///
    /// This is the context-construction path for transaction calls; it never
    /// enrolls.
    pub async fn user_context(&self, user_id: &str) -> Result<FabricUser, GatewayError> {
        let org = &self.config.member_name;
        match self.identities.load(user_id, org).await? {
            Some(enrollment) => Ok(self.user(user_id, enrollment)),
            None => Err(GatewayError::NotEnrolled(user_id.to_string())),
        }
    }
}
