// SPDX-License-Identifier: AGPL-3.0-or-later

//! Generic chaincode query and invoke endpoints.
//!
//! Both endpoints lazily initialize the channel and act as the configured
//! application identity, which must have been enrolled first.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::config::AmbConfig;
use crate::error::{ApiError, GatewayError};
use crate::fabric::{CommitHandle, CommitWait};
use crate::identity::FabricUser;
use crate::models::{CommitStatus, InvokeRequest, InvokeResponse, QueryRequest};
use crate::state::AppState;

/// Connect the channel if needed and resolve the acting identity.
pub(crate) async fn app_user_context(state: &AppState) -> Result<FabricUser, ApiError> {
    state.gateway.setup().await?;
    let app_user = state.gateway.config().app_user.clone();
    Ok(state.gateway.user_context(&app_user).await?)
}

/// Log the commit verdict from a background task.
///
/// Every pending response hands its handle here, so an ordering failure is
/// always at least logged even when no caller is waiting.
fn observe_commit(handle: CommitHandle) {
    let transaction_id = handle.transaction_id().to_string();
    tokio::spawn(async move {
        match handle.wait().await {
            Ok(event) => info!(
                transaction_id = %event.transaction_id,
                block_number = event.block_number,
                "transaction committed"
            ),
            Err(e) => error!(%transaction_id, error = %e, "transaction commit failed"),
        }
    });
}

/// Turn an accepted invocation into its HTTP response per the configured
/// commit wait policy.
///
/// With a wait configured the handler blocks up to that long for the commit
/// event; a timed-out or unconfigured wait reports the transaction as
/// pending and keeps observing the verdict in the background.
pub(crate) async fn commit_response(
    config: &AmbConfig,
    handle: CommitHandle,
) -> Result<InvokeResponse, ApiError> {
    let transaction_id = handle.transaction_id().to_string();
    let pending = |transaction_id| InvokeResponse {
        transaction_id,
        status: CommitStatus::Pending,
        block_number: None,
    };

    match config.commit_wait {
        Some(wait) => match handle.wait_timeout(wait).await {
            CommitWait::Committed(event) => Ok(InvokeResponse {
                transaction_id,
                status: CommitStatus::Committed,
                block_number: Some(event.block_number),
            }),
            CommitWait::Pending(handle) => {
                observe_commit(handle);
                Ok(pending(transaction_id))
            }
            CommitWait::Failed(e) => Err(ApiError::from(GatewayError::from(e))),
        },
        None => {
            observe_commit(handle);
            Ok(pending(transaction_id))
        }
    }
}

/// Evaluate a chaincode function on the query path.
#[utoipa::path(
    get,
    path = "/query",
    params(QueryRequest),
    tag = "Chaincode",
    responses(
        (status = 200, description = "Raw chaincode payload", body = String),
        (status = 400, description = "Identity not enrolled or peers disagree"),
        (status = 500, description = "Channel or network failure")
    )
)]
pub async fn query(
    State(state): State<AppState>,
    Query(request): Query<QueryRequest>,
) -> Result<String, ApiError> {
    let user = app_user_context(&state).await?;
    let payload = state
        .gateway
        .query_chaincode(
            &user,
            &request.chaincode_name,
            &request.function_name,
            &request.args,
        )
        .await?;
    Ok(payload)
}

/// Submit a chaincode invocation for endorsement and ordering.
#[utoipa::path(
    post,
    path = "/invoke",
    request_body = InvokeRequest,
    tag = "Chaincode",
    responses(
        (status = 202, description = "Invocation accepted for ordering", body = InvokeResponse),
        (status = 400, description = "Identity not enrolled"),
        (status = 500, description = "Endorsement incomplete or network failure")
    )
)]
pub async fn invoke(
    State(state): State<AppState>,
    Json(request): Json<InvokeRequest>,
) -> Result<(StatusCode, Json<InvokeResponse>), ApiError> {
    let user = app_user_context(&state).await?;
    let handle = state
        .gateway
        .invoke_chaincode(
            &user,
            &request.chaincode_name,
            &request.function_name,
            request.arg_list,
        )
        .await?;
    let response = commit_response(state.gateway.config(), handle).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::CommitEvent;
    use crate::testutil::test_config;
    use std::time::Duration;

    #[tokio::test]
    async fn commit_within_the_wait_reports_the_block_number() {
        let mut config = test_config();
        config.commit_wait = Some(Duration::from_millis(100));

        let (tx, handle) = CommitHandle::channel("tx-1");
        tx.send(Ok(CommitEvent {
            transaction_id: "tx-1".to_string(),
            block_number: 9,
        }))
        .unwrap();

        let response = commit_response(&config, handle).await.unwrap();
        assert_eq!(response.status, CommitStatus::Committed);
        assert_eq!(response.block_number, Some(9));
    }

    #[tokio::test]
    async fn timed_out_commit_stays_observed() {
        let mut config = test_config();
        config.commit_wait = Some(Duration::from_millis(10));

        let (tx, handle) = CommitHandle::channel("tx-2");
        let response = commit_response(&config, handle).await.unwrap();
        assert_eq!(response.status, CommitStatus::Pending);
        assert!(response.block_number.is_none());

        // The verdict still has a receiver after the wait elapsed.
        assert!(tx
            .send(Ok(CommitEvent {
                transaction_id: "tx-2".to_string(),
                block_number: 3,
            }))
            .is_ok());
    }

    #[tokio::test]
    async fn no_wait_policy_still_observes_the_verdict() {
        let config = test_config();
        assert!(config.commit_wait.is_none());

        let (tx, handle) = CommitHandle::channel("tx-3");
        let response = commit_response(&config, handle).await.unwrap();
        assert_eq!(response.status, CommitStatus::Pending);
        assert!(tx
            .send(Err(crate::fabric::NetworkError::Ordering(
                "orderer refused".to_string()
            )))
            .is_ok());
    }
}
