// SPDX-License-Identifier: AGPL-3.0-or-later

//! Self-signed development CA.
//!
//! Issues P-256 identities without a real Fabric CA: enrollment generates a
//! fresh key and self-signs a certificate for it. Registration bookkeeping
//! (known identities, enrollment secrets, duplicate rejection) behaves like
//! the real thing so the enrollment state machine can be exercised
//! end-to-end locally.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use p256::elliptic_curve::rand_core::OsRng;
use p256::pkcs8::EncodePrivateKey;
use p256::SecretKey;
use rcgen::{CertificateParams, DnType, DnValue, KeyPair};
use tracing::info;

use super::{CaError, CertificateAuthority, RegistrationRequest};
use crate::identity::{Enrollment, FabricUser};

/// In-process CA for the dev backend and tests.
pub struct DevCa {
    admin_user: String,
    admin_secret: String,
    registered: Mutex<HashMap<String, String>>,
}

impl DevCa {
    pub fn new(admin_user: impl Into<String>, admin_secret: impl Into<String>) -> Self {
        Self {
            admin_user: admin_user.into(),
            admin_secret: admin_secret.into(),
            registered: Mutex::new(HashMap::new()),
        }
    }

    fn expected_secret(&self, user_id: &str) -> Option<String> {
        if user_id == self.admin_user {
            return Some(self.admin_secret.clone());
        }
        self.registered
            .lock()
            .expect("registration map poisoned")
            .get(user_id)
            .cloned()
    }
}

/// Self-sign a certificate for `user_id` over the given key.
fn issue_certificate(secret_key: &SecretKey, user_id: &str) -> Result<String, CaError> {
    let pkcs8 = secret_key
        .to_pkcs8_der()
        .map_err(|e| CaError::Request(format!("PKCS#8 encoding failed: {e}")))?;
    let key_pair = KeyPair::try_from(pkcs8.as_bytes())
        .map_err(|e| CaError::Request(format!("key pair rejected: {e}")))?;

    let mut params = CertificateParams::default();
    params.distinguished_name.push(
        DnType::CommonName,
        DnValue::Utf8String(user_id.to_string()),
    );

    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| CaError::Request(format!("self-signing failed: {e}")))?;
    Ok(cert.pem())
}

#[async_trait]
impl CertificateAuthority for DevCa {
    async fn enroll(&self, user_id: &str, secret: &str) -> Result<Enrollment, CaError> {
        match self.expected_secret(user_id) {
            Some(expected) if expected == secret => {}
            Some(_) => {
                return Err(CaError::Rejected {
                    message: format!("authentication failure for {user_id}"),
                })
            }
            None => {
                return Err(CaError::Rejected {
                    message: format!("identity {user_id} is not registered"),
                })
            }
        }

        let secret_key = SecretKey::random(&mut OsRng);
        let certificate_pem = issue_certificate(&secret_key, user_id)?;
        info!(user_id, "dev CA issued self-signed enrollment");
        Ok(Enrollment::new(secret_key, certificate_pem))
    }

    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &FabricUser,
    ) -> Result<String, CaError> {
        let mut registered = self.registered.lock().expect("registration map poisoned");
        if request.user_id == self.admin_user || registered.contains_key(&request.user_id) {
            return Err(CaError::Rejected {
                message: format!("identity {} is already registered", request.user_id),
            });
        }

        registered.insert(request.user_id.clone(), request.secret.clone());
        info!(
            user_id = %request.user_id,
            registrar = %registrar.user_id(),
            affiliation = %request.affiliation,
            "dev CA registered identity"
        );
        Ok(request.secret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn admin_user(ca: &DevCa) -> FabricUser {
        let enrollment = ca.enroll("admin", "Password123").await.expect("enroll");
        FabricUser::new("admin", "Org1", "m-msp", enrollment)
    }

    #[tokio::test]
    async fn enroll_issues_a_certificate_for_the_generated_key() {
        let ca = DevCa::new("admin", "Password123");
        let enrollment = ca.enroll("admin", "Password123").await.unwrap();
        assert!(enrollment
            .certificate_pem()
            .contains("BEGIN CERTIFICATE"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let ca = DevCa::new("admin", "Password123");
        let err = ca.enroll("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, CaError::Rejected { .. }));
    }

    #[tokio::test]
    async fn register_then_enroll_works_once() {
        let ca = DevCa::new("admin", "Password123");
        let admin = admin_user(&ca).await;

        let request = RegistrationRequest::new("lambdaUser", "Org1", "LambdaUserPwd1");
        let secret = ca.register(&request, &admin).await.unwrap();
        assert_eq!(secret, "LambdaUserPwd1");

        let enrollment = ca.enroll("lambdaUser", &secret).await.unwrap();
        assert!(enrollment.certificate_pem().contains("BEGIN CERTIFICATE"));

        // Duplicate registration is an application error.
        let err = ca.register(&request, &admin).await.unwrap_err();
        assert!(matches!(err, CaError::Rejected { .. }));
    }

    #[tokio::test]
    async fn unregistered_identity_cannot_enroll() {
        let ca = DevCa::new("admin", "Password123");
        let err = ca.enroll("stranger", "whatever").await.unwrap_err();
        assert!(matches!(err, CaError::Rejected { .. }));
    }
}
