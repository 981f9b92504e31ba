// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fabric CA REST client.
//!
//! Speaks the CA's HTTP API: `POST /api/v1/enroll` authenticated with the
//! enrollment id/secret pair (basic auth) carrying a PKCS#10 CSR, and
//! `POST /api/v1/register` authenticated with the registrar's token, the
//! certificate and an ECDSA signature over the request body, both Base64,
//! joined by dots. Key generation and CSR construction happen client-side;
//! the CA only ever sees public material.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::pkcs8::EncodePrivateKey;
use p256::SecretKey;
use rcgen::{CertificateParams, DnType, DnValue, KeyPair};
use serde::Deserialize;
use tracing::{debug, info};

use super::{CaError, CertificateAuthority, RegistrationRequest};
use crate::identity::{Enrollment, FabricUser};

/// HTTP client for a Fabric CA endpoint.
pub struct FabricCaClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CaResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    errors: Vec<CaResponseError>,
}

#[derive(Debug, Deserialize)]
struct CaResponseError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EnrollResult {
    /// Base64 over the issued certificate PEM.
    #[serde(rename = "Cert")]
    cert: String,
}

#[derive(Debug, Deserialize)]
struct RegisterResult {
    secret: String,
}

impl FabricCaClient {
    /// Create a client for the CA at `base_url`, trusting `tls_root_pem`
    /// (the network's TLS chain) when provided.
    pub fn new(base_url: &str, tls_root_pem: Option<&str>) -> Result<Self, CaError> {
        let parsed: url::Url = base_url
            .parse()
            .map_err(|e| CaError::Request(format!("invalid CA URL {base_url}: {e}")))?;

        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(pem) = tls_root_pem {
            let cert = reqwest::Certificate::from_pem(pem.as_bytes())
                .map_err(|e| CaError::Request(format!("invalid TLS trust material: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| CaError::Request(format!("HTTP client construction failed: {e}")))?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn unwrap_result<T>(response: CaResponse<T>) -> Result<T, CaError> {
        if let Some(result) = response.result {
            if response.success || response.errors.is_empty() {
                return Ok(result);
            }
        }
        let message = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Err(CaError::Rejected {
            message: if message.is_empty() {
                "request failed without error detail".to_string()
            } else {
                message
            },
        })
    }
}

/// Build a PKCS#10 CSR for `user_id` over the given key.
fn build_csr(secret_key: &SecretKey, user_id: &str) -> Result<String, CaError> {
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

    let csr = params
        .serialize_request(&key_pair)
        .map_err(|e| CaError::Request(format!("CSR construction failed: {e}")))?;
    csr.pem()
        .map_err(|e| CaError::Request(format!("CSR encoding failed: {e}")))
}

/// Fabric CA authorization token: `b64(cert).b64(sig)` where the signature
/// covers `b64(body).b64(cert)` with the registrar's key.
fn auth_token(enrollment: &Enrollment, body: &[u8]) -> Result<String, CaError> {
    let b64_body = BASE64.encode(body);
    let b64_cert = BASE64.encode(enrollment.certificate_pem().as_bytes());
    let payload = format!("{b64_body}.{b64_cert}");

    let signing_key = SigningKey::from(enrollment.secret_key());
    let signature: Signature = signing_key.sign(payload.as_bytes());

    Ok(format!(
        "{b64_cert}.{}",
        BASE64.encode(signature.to_der().as_bytes())
    ))
}

#[async_trait]
impl CertificateAuthority for FabricCaClient {
    async fn enroll(&self, user_id: &str, secret: &str) -> Result<Enrollment, CaError> {
        let secret_key = SecretKey::random(&mut OsRng);
        let csr = build_csr(&secret_key, user_id)?;
        debug!(user_id, "submitting enrollment CSR to CA");

        let response = self
            .http
            .post(self.endpoint("api/v1/enroll"))
            .basic_auth(user_id, Some(secret))
            .json(&serde_json::json!({ "certificate_request": csr }))
            .send()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CaError::Rejected {
                message: format!("authentication failure for {user_id}"),
            });
        }

        let body: CaResponse<EnrollResult> = response
            .json()
            .await
            .map_err(|e| CaError::InvalidResponse(e.to_string()))?;
        let result = Self::unwrap_result(body)?;

        let cert_pem = BASE64
            .decode(result.cert.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| {
                CaError::InvalidResponse("certificate is not Base64 PEM".to_string())
            })?;
        pem::parse(&cert_pem)
            .map_err(|e| CaError::InvalidResponse(format!("certificate is not valid PEM: {e}")))?;

        info!(user_id, "CA issued enrollment certificate");
        Ok(Enrollment::new(secret_key, cert_pem))
    }

    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &FabricUser,
    ) -> Result<String, CaError> {
        let body = serde_json::json!({
            "id": request.user_id,
            "type": "client",
            "affiliation": request.affiliation,
            "secret": request.secret,
        });
        let body_bytes = serde_json::to_vec(&body)
            .map_err(|e| CaError::Request(format!("request serialization failed: {e}")))?;
        let token = auth_token(registrar.enrollment(), &body_bytes)?;
        debug!(user_id = %request.user_id, registrar = %registrar.user_id(), "registering identity with CA");

        let response = self
            .http
            .post(self.endpoint("api/v1/register"))
            .header("Authorization", token)
            .body(body_bytes)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| CaError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CaError::Rejected {
                message: "registrar token rejected".to_string(),
            });
        }

        let body: CaResponse<RegisterResult> = response
            .json()
            .await
            .map_err(|e| CaError::InvalidResponse(e.to_string()))?;
        let result = Self::unwrap_result(body)?;

        info!(user_id = %request.user_id, "CA registered identity");
        Ok(result.secret)
    }
}
