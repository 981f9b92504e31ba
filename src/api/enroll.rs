// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::models::EnrollResponse;
use crate::state::AppState;

/// Enroll the configured application identity.
///
/// Idempotent: an already-enrolled identity is reconstructed from the
/// secret store without touching the CA.
#[utoipa::path(
    post,
    path = "/enroll-lambda-user",
    tag = "Identity",
    responses(
        (status = 200, description = "Identity enrolled or already enrolled", body = EnrollResponse),
        (status = 400, description = "The CA rejected the enrollment"),
        (status = 500, description = "Secret store or CA unavailable")
    )
)]
pub async fn enroll_lambda_user(
    State(state): State<AppState>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let user = state.gateway.enroll_app_user().await?;
    Ok(Json(EnrollResponse {
        user_id: user.user_id().to_string(),
        message: format!("Successfully enrolled user {}", user.user_id()),
    }))
}
