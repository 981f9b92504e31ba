// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity repository: builds and stores enrollments through the secret
//! store gateway.
//!
//! ## Secret layout
//!
//! Two named secrets per (organization, user):
//!
//! ```text
//! fabric/orgs/<org>/<user>/pk     # Base64 over PKCS#8 DER private key
//! fabric/orgs/<org>/<user>/certs  # certificate PEM
//! ```
//!
//! Both halves exist or neither does from the caller's perspective: a
//! partial pair reads as not-found. There is no transactional guarantee
//! across the two writes; the per-secret [`SaveOutcome`] makes a partial
//! create visible.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{decode_private_key, Enrollment};
use crate::error::GatewayError;
use crate::secrets::{CreateOutcome, SecretStore, SecretStoreError};

/// Namespace prefix for all enrollment secrets.
const SECRET_NAMESPACE: &str = "fabric/orgs";

/// Per-secret result of a save.
#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    pub private_key: CreateOutcome,
    pub certificate: CreateOutcome,
}

impl SaveOutcome {
    /// True when both secrets were freshly written.
    pub fn fully_created(&self) -> bool {
        self.private_key.created() && self.certificate.created()
    }
}

/// Loads and persists user enrollments.
#[derive(Clone)]
pub struct IdentityRepository {
    store: Arc<dyn SecretStore>,
}

impl IdentityRepository {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    fn private_key_secret(org: &str, user_id: &str) -> String {
        format!("{SECRET_NAMESPACE}/{org}/{user_id}/pk")
    }

    fn certificate_secret(org: &str, user_id: &str) -> String {
        format!("{SECRET_NAMESPACE}/{org}/{user_id}/certs")
    }

    /// Load a user's enrollment from the store.
    ///
    /// Returns `Ok(None)` when either secret is absent, the normal trigger
    /// for the CA enrollment path. A store outage or an undecodable key is
    /// an error, not a not-found.
    pub async fn load(
        &self,
        user_id: &str,
        org: &str,
    ) -> Result<Option<Enrollment>, GatewayError> {
        debug!(user_id, org, "looking up enrollment credentials");

        let encoded_key = match self.store.get(&Self::private_key_secret(org, user_id)).await {
            Ok(value) => value,
            Err(SecretStoreError::NotFound(name)) => {
                debug!(user_id, secret = %name, "credentials not found in secret store");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let certificate_pem = match self.store.get(&Self::certificate_secret(org, user_id)).await {
            Ok(value) => value,
            Err(SecretStoreError::NotFound(name)) => {
                // Half a pair behaves like no pair at all.
                warn!(user_id, secret = %name, "private key present but certificate missing");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let secret_key = decode_private_key(&encoded_key)?;
        info!(user_id, org, "enrollment reconstructed from secret store");
        Ok(Some(Enrollment::new(secret_key, certificate_pem)))
    }

    /// Persist an enrollment under the deterministic secret names.
    ///
    /// Idempotent-create semantics: a secret that already exists is left
    /// untouched and reported as such.
    pub async fn save(
        &self,
        user_id: &str,
        org: &str,
        enrollment: &Enrollment,
    ) -> Result<SaveOutcome, GatewayError> {
        let certificate = self
            .store
            .create(
                &Self::certificate_secret(org, user_id),
                enrollment.certificate_pem(),
            )
            .await?;

        let private_key = self
            .store
            .create(
                &Self::private_key_secret(org, user_id),
                &enrollment.encode_private_key()?,
            )
            .await?;

        let outcome = SaveOutcome {
            private_key,
            certificate,
        };
        if outcome.fully_created() {
            info!(user_id, org, "enrollment credentials saved to secret store");
        } else {
            warn!(
                user_id,
                org,
                pk_created = private_key.created(),
                cert_created = certificate.created(),
                "enrollment credentials partially present; existing secrets kept"
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use p256::elliptic_curve::rand_core::OsRng;
    use p256::SecretKey;

    fn new_enrollment() -> Enrollment {
        Enrollment::new(
            SecretKey::random(&mut OsRng),
            "-----BEGIN CERTIFICATE-----\nabc\n-----END CERTIFICATE-----\n",
        )
    }

    fn repo() -> (Arc<MemorySecretStore>, IdentityRepository) {
        let store = Arc::new(MemorySecretStore::new());
        let repo = IdentityRepository::new(store.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn save_then_load_returns_the_same_credentials() {
        let (_store, repo) = repo();
        let enrollment = new_enrollment();

        let outcome = repo
            .save("lambdaUser", "OrganizationMember1", &enrollment)
            .await
            .unwrap();
        assert!(outcome.fully_created());

        let loaded = repo
            .load("lambdaUser", "OrganizationMember1")
            .await
            .unwrap()
            .expect("enrollment should exist");
        assert_eq!(loaded.certificate_pem(), enrollment.certificate_pem());
        assert_eq!(
            loaded.secret_key().to_bytes(),
            enrollment.secret_key().to_bytes()
        );
    }

    #[tokio::test]
    async fn load_of_unknown_user_is_none() {
        let (_store, repo) = repo();
        let result = repo.load("nobody", "OrganizationMember1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn partial_pair_reads_as_not_found() {
        let (store, repo) = repo();
        let enrollment = new_enrollment();

        // Only the private key half is written.
        store
            .create(
                "fabric/orgs/OrganizationMember1/half/pk",
                &enrollment.encode_private_key().unwrap(),
            )
            .await
            .unwrap();

        let result = repo.load("half", "OrganizationMember1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn save_never_overwrites_existing_secrets() {
        let (_store, repo) = repo();
        let first = new_enrollment();
        let second = new_enrollment();

        repo.save("alice", "Org1", &first).await.unwrap();
        let outcome = repo.save("alice", "Org1", &second).await.unwrap();
        assert!(!outcome.private_key.created());
        assert!(!outcome.certificate.created());

        let loaded = repo.load("alice", "Org1").await.unwrap().unwrap();
        assert_eq!(
            loaded.secret_key().to_bytes(),
            first.secret_key().to_bytes()
        );
    }

    #[tokio::test]
    async fn store_outage_is_an_error_not_a_not_found() {
        let (store, repo) = repo();
        store.set_unavailable(true);

        let err = repo.load("anyone", "Org1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Store(_)));
    }

    #[tokio::test]
    async fn undecodable_key_is_a_credential_format_error() {
        let (store, repo) = repo();
        store
            .create("fabric/orgs/Org1/broken/pk", "!!!! not a key !!!!")
            .await
            .unwrap();
        store
            .create("fabric/orgs/Org1/broken/certs", "cert")
            .await
            .unwrap();

        let err = repo.load("broken", "Org1").await.unwrap_err();
        assert!(matches!(err, GatewayError::CredentialFormat(_)));
    }
}
