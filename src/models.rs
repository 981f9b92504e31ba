// SPDX-License-Identifier: AGPL-3.0-or-later

//! REST request and response shapes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A car record as stored by the fabcar sample chaincode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Car {
    /// Ledger key, e.g. `CAR0`. Absent inside the stored payload.
    #[serde(default)]
    pub id: String,
    pub make: String,
    pub model: String,
    pub colour: String,
    pub owner: String,
}

/// Generic chaincode query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub chaincode_name: String,
    pub function_name: String,
    /// Single argument passed to the chaincode function. Missing means an
    /// empty argument.
    #[serde(default)]
    pub args: String,
}

/// Generic chaincode invocation request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub chaincode_name: String,
    pub function_name: String,
    #[serde(default)]
    pub arg_list: Vec<String>,
}

/// Result of enrolling the application identity.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub user_id: String,
    pub message: String,
}

/// Commit state of an accepted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    /// The ordering service committed the transaction into a block.
    Committed,
    /// Ordering is still in flight; the outcome is logged when it arrives.
    Pending,
}

/// Response for an invocation accepted for ordering.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvokeResponse {
    pub transaction_id: String,
    pub status: CommitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_request_accepts_the_camel_case_wire_shape() {
        let request: InvokeRequest = serde_json::from_str(
            r#"{"chaincodeName":"fabcar","functionName":"createCar","argList":["CAR0","Toyota","Prius","blue","Tomoko"]}"#,
        )
        .unwrap();
        assert_eq!(request.chaincode_name, "fabcar");
        assert_eq!(request.arg_list.len(), 5);
    }

    #[test]
    fn car_payload_without_id_deserializes() {
        let car: Car = serde_json::from_str(
            r#"{"make":"Toyota","model":"Prius","colour":"blue","owner":"Tomoko"}"#,
        )
        .unwrap();
        assert!(car.id.is_empty());
        assert_eq!(car.make, "Toyota");
    }

    #[test]
    fn pending_response_omits_the_block_number() {
        let response = InvokeResponse {
            transaction_id: "tx-1".to_string(),
            status: CommitStatus::Pending,
            block_number: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"transactionId":"tx-1","status":"pending"}"#);
    }
}
