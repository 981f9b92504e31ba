// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fabric identities and their credential material.
//!
//! An [`Enrollment`] is the raw credential pair: a NIST P-256 private key
//! and the CA-signed certificate proving membership. A [`FabricUser`] binds
//! an enrollment to a user id and organization, and is passed explicitly to
//! every transaction call; there is no shared mutable "current user"
//! context in this gateway.
//!
//! ## Serialized form
//!
//! The private key travels through the secret store as Base64 over PKCS#8
//! DER; the certificate as PEM text. `encode_private_key` /
//! `decode_private_key` are the only places that transform is implemented.

pub mod repository;

pub use repository::{IdentityRepository, SaveOutcome};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use p256::SecretKey;

use crate::error::GatewayError;

/// A private key + signed certificate pair.
#[derive(Clone)]
pub struct Enrollment {
    secret_key: SecretKey,
    certificate_pem: String,
}

impl Enrollment {
    pub fn new(secret_key: SecretKey, certificate_pem: impl Into<String>) -> Self {
        Self {
            secret_key,
            certificate_pem: certificate_pem.into(),
        }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    /// Certificate in PEM form, exactly as issued by the CA.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// Base64 over the PKCS#8 DER encoding of the private key.
    pub fn encode_private_key(&self) -> Result<String, GatewayError> {
        let der = self
            .secret_key
            .to_pkcs8_der()
            .map_err(|e| GatewayError::CredentialFormat(format!("PKCS#8 encoding failed: {e}")))?;
        Ok(BASE64.encode(der.as_bytes()))
    }
}

// The key is deliberately left out of Debug output.
impl std::fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enrollment")
            .field("certificate_pem", &self.certificate_pem)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Decode a Base64/PKCS#8 private key back into usable key material.
///
/// A present-but-undecodable key is a credential format error, never "not
/// found": mapping it to not-found would trigger re-enrollment of an
/// identity the CA already knows.
pub fn decode_private_key(encoded: &str) -> Result<SecretKey, GatewayError> {
    let der = BASE64
        .decode(encoded.trim())
        .map_err(|e| GatewayError::CredentialFormat(format!("invalid Base64 key: {e}")))?;
    SecretKey::from_pkcs8_der(&der)
        .map_err(|e| GatewayError::CredentialFormat(format!("invalid PKCS#8 key: {e}")))
}

/// A user identity acting on the network.
///
/// Immutable after creation; clone it into whichever call needs it.
#[derive(Debug, Clone)]
pub struct FabricUser {
    user_id: String,
    organization: String,
    msp_id: String,
    enrollment: Enrollment,
}

impl FabricUser {
    pub fn new(
        user_id: impl Into<String>,
        organization: impl Into<String>,
        msp_id: impl Into<String>,
        enrollment: Enrollment,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            organization: organization.into(),
            msp_id: msp_id.into(),
            enrollment,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }
}
