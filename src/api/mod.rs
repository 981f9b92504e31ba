// SPDX-License-Identifier: AGPL-3.0-or-later

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{Car, CommitStatus, EnrollResponse, InvokeRequest, InvokeResponse},
    state::AppState,
};

pub mod cars;
pub mod chaincode;
pub mod enroll;
pub mod health;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/enroll-lambda-user", post(enroll::enroll_lambda_user))
        .route("/query", get(chaincode::query))
        .route("/invoke", post(chaincode::invoke))
        .route("/cars", post(cars::create_car))
        .route("/cars/{car_id}", get(cars::get_car))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        enroll::enroll_lambda_user,
        chaincode::query,
        chaincode::invoke,
        cars::get_car,
        cars::create_car,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Car,
            CommitStatus,
            EnrollResponse,
            InvokeRequest,
            InvokeResponse,
            health::HealthChecks,
            health::HealthResponse,
            health::ReadyResponse
        )
    ),
    tags(
        (name = "Identity", description = "Application identity enrollment"),
        (name = "Chaincode", description = "Generic chaincode query and invoke"),
        (name = "Cars", description = "fabcar sample endpoints"),
        (name = "Health", description = "Probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::dev_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(dev_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }
}
