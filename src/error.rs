// SPDX-License-Identifier: AGPL-3.0-or-later

//! Gateway error taxonomy and its HTTP mapping.
//!
//! Credential and validation failures (the CA rejecting a request, malformed
//! key material, an identity that was never enrolled) map to 400;
//! setup/infrastructure failures (secret store outage, network transport,
//! uninitialized session) map to 500, matching the original facade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ca::CaError;
use crate::fabric::NetworkError;
use crate::secrets::SecretStoreError;

/// Errors surfaced by the gateway core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The secret store could not answer (outage, not a missing secret).
    #[error("secret store error: {0}")]
    Store(#[from] SecretStoreError),

    /// Stored key or certificate material is malformed.
    #[error("malformed credential material: {0}")]
    CredentialFormat(String),

    /// The certificate authority failed or rejected a request.
    #[error(transparent)]
    Ca(#[from] CaError),

    /// The identity has no stored enrollment and this call does not enroll.
    #[error("user {0} is not enrolled")]
    NotEnrolled(String),

    /// Client or channel used before setup; programming-usage error.
    #[error("client/channel not initialized; run setup first")]
    NotReady,

    /// Channel construction or TLS trust material failed.
    #[error("channel setup failed: {0}")]
    Setup(String),

    /// At least one peer refused to endorse; nothing was ordered.
    #[error("proposal rejected by {failed} of {total} peers")]
    ProposalRejected { failed: usize, total: usize },

    /// Peers returned conflicting query payloads (require-agreement mode).
    #[error("peers returned conflicting query payloads")]
    QueryMismatch,

    /// Opaque network operation failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl GatewayError {
    /// HTTP status this error maps to at the REST boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::CredentialFormat(_)
            | GatewayError::NotEnrolled(_)
            | GatewayError::Setup(_)
            | GatewayError::QueryMismatch
            | GatewayError::Ca(CaError::Rejected { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Store(_)
            | GatewayError::NotReady
            | GatewayError::ProposalRejected { .. }
            | GatewayError::Network(_)
            | GatewayError::Ca(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response at the REST boundary.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        Self::new(e.status_code(), e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn credential_errors_map_to_bad_request() {
        assert_eq!(
            GatewayError::CredentialFormat("bad key".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::NotEnrolled("lambdaUser".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::Ca(CaError::Rejected {
                message: "authorization failure".into()
            })
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn infrastructure_errors_map_to_internal() {
        assert_eq!(
            GatewayError::NotReady.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::ProposalRejected { failed: 1, total: 3 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GatewayError::Ca(CaError::Transport("connection refused".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
