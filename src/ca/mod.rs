// SPDX-License-Identifier: AGPL-3.0-or-later

//! Certificate authority boundary.
//!
//! The CA issues enrollments: it signs a certificate for a freshly generated
//! private key. Two operations cross this boundary: `enroll` (exchange an
//! id/secret for credentials) and `register` (an enrolled registrar creates
//! a new identity and receives its enrollment secret).
//!
//! ## Implementations
//!
//! | Backend | Purpose |
//! |---------|---------|
//! | [`http::FabricCaClient`] | Fabric CA REST API over HTTPS |
//! | [`dev::DevCa`] | Self-signed issuance for local development and tests |

pub mod dev;
pub mod enrollment;
pub mod http;

pub use dev::DevCa;
pub use enrollment::EnrollmentManager;
pub use http::FabricCaClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{Enrollment, FabricUser};

/// Errors from CA operations.
#[derive(Debug, Error)]
pub enum CaError {
    /// The CA processed the request and said no (bad secret, duplicate
    /// registration, invalid argument). An application error, not retried.
    #[error("certificate authority rejected request: {message}")]
    Rejected { message: String },

    /// The CA could not be reached.
    #[error("certificate authority unreachable: {0}")]
    Transport(String),

    /// The CA answered with something this client cannot interpret.
    #[error("invalid certificate authority response: {0}")]
    InvalidResponse(String),

    /// Local CSR or key material construction failed.
    #[error("certificate request construction failed: {0}")]
    Request(String),
}

/// Registration request for a new network identity.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Identity to create.
    pub user_id: String,
    /// Affiliation (organization/member name).
    pub affiliation: String,
    /// Enrollment secret the new identity will use.
    pub secret: String,
}

impl RegistrationRequest {
    pub fn new(
        user_id: impl Into<String>,
        affiliation: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            affiliation: affiliation.into(),
            secret: secret.into(),
        }
    }
}

/// Client-side view of the certificate authority.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Enroll an identity: generate key material, obtain a signed
    /// certificate for it.
    async fn enroll(&self, user_id: &str, secret: &str) -> Result<Enrollment, CaError>;

    /// Register a new identity using an already-enrolled registrar; returns
    /// the enrollment secret for the new identity.
    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &FabricUser,
    ) -> Result<String, CaError>;
}
