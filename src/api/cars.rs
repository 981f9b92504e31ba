// SPDX-License-Identifier: AGPL-3.0-or-later

//! fabcar convenience endpoints over the generic transaction flows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::chaincode::{app_user_context, commit_response};
use crate::error::ApiError;
use crate::models::{Car, InvokeResponse};
use crate::state::AppState;

const CAR_CHAINCODE: &str = "fabcar";
const QUERY_CAR: &str = "queryCar";
const CREATE_CAR: &str = "createCar";

/// Fetch one car by its ledger key.
#[utoipa::path(
    get,
    path = "/cars/{car_id}",
    params(
        ("car_id" = String, Path, description = "Ledger key of the car, e.g. CAR0")
    ),
    tag = "Cars",
    responses(
        (status = 200, body = Car),
        (status = 404, description = "No car under that key"),
        (status = 500, description = "Channel or network failure")
    )
)]
pub async fn get_car(
    Path(car_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Car>, ApiError> {
    let user = app_user_context(&state).await?;
    let payload = state
        .gateway
        .query_chaincode(&user, CAR_CHAINCODE, QUERY_CAR, &car_id)
        .await?;

    if payload.is_empty() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no car found under {car_id}"),
        ));
    }

    let mut car: Car = serde_json::from_str(&payload)
        .map_err(|e| ApiError::internal(format!("unexpected chaincode payload: {e}")))?;
    car.id = car_id;
    Ok(Json(car))
}

/// Record a new car on the ledger.
#[utoipa::path(
    post,
    path = "/cars",
    request_body = Car,
    tag = "Cars",
    responses(
        (status = 202, description = "Creation accepted for ordering", body = InvokeResponse),
        (status = 400, description = "Missing car id or identity not enrolled"),
        (status = 500, description = "Endorsement incomplete or network failure")
    )
)]
pub async fn create_car(
    State(state): State<AppState>,
    Json(car): Json<Car>,
) -> Result<(StatusCode, Json<InvokeResponse>), ApiError> {
    if car.id.is_empty() {
        return Err(ApiError::bad_request("car id must not be empty"));
    }

    let user = app_user_context(&state).await?;
    let handle = state
        .gateway
        .invoke_chaincode(
            &user,
            CAR_CHAINCODE,
            CREATE_CAR,
            vec![car.id, car.make, car.model, car.colour, car.owner],
        )
        .await?;
    let response = commit_response(state.gateway.config(), handle).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::enroll::enroll_lambda_user;
    use crate::models::CommitStatus;
    use crate::testutil::dev_state;

    #[tokio::test]
    async fn create_then_get_car_through_the_handlers() {
        let state = dev_state();
        enroll_lambda_user(State(state.clone())).await.unwrap();

        let car = Car {
            id: "CAR0".to_string(),
            make: "Toyota".to_string(),
            model: "Prius".to_string(),
            colour: "blue".to_string(),
            owner: "Tomoko".to_string(),
        };
        let (status, Json(accepted)) = create_car(State(state.clone()), Json(car.clone()))
            .await
            .expect("creation accepted");
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(accepted.status, CommitStatus::Pending);
        assert!(!accepted.transaction_id.is_empty());

        // The dev orderer commits asynchronously.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let Json(fetched) = get_car(Path("CAR0".to_string()), State(state))
            .await
            .expect("car exists");
        assert_eq!(fetched, car);
    }

    #[tokio::test]
    async fn missing_car_is_a_404() {
        let state = dev_state();
        enroll_lambda_user(State(state.clone())).await.unwrap();

        let err = get_car(Path("CAR404".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn car_without_an_id_is_rejected() {
        let state = dev_state();
        enroll_lambda_user(State(state.clone())).await.unwrap();

        let car = Car {
            id: String::new(),
            make: "Toyota".to_string(),
            model: "Prius".to_string(),
            colour: "blue".to_string(),
            owner: "Tomoko".to_string(),
        };
        let err = create_car(State(state), Json(car)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unenrolled_identity_cannot_transact() {
        let state = dev_state();
        let err = get_car(Path("CAR0".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
