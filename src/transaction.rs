// SPDX-License-Identifier: AGPL-3.0-or-later

//! Query and invoke flows over an initialized channel.
//!
//! Queries never touch the orderer. Invocations are all-or-nothing: the
//! proposal goes to every channel peer, and a single refusal fails the call
//! before anything reaches ordering. On full endorsement the complete
//! response set is handed to the orderer and commitment proceeds
//! asynchronously behind a [`CommitHandle`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::QueryAggregation;
use crate::error::GatewayError;
use crate::fabric::{CommitHandle, FabricChannel, ProposalRequest};
use crate::identity::FabricUser;

/// Evaluate `function(arg)` on every channel peer and collapse the
/// responses into one payload.
///
/// `LastResponder` keeps the inherited behavior: the payload of the last
/// responding peer wins, and an empty response set yields an empty string.
/// `RequireAgreement` instead fails when peers disagree.
pub async fn query_chaincode(
    channel: &Arc<dyn FabricChannel>,
    context: &FabricUser,
    chaincode: &str,
    function: &str,
    arg: &str,
    wait: Duration,
    aggregation: QueryAggregation,
) -> Result<String, GatewayError> {
    let request = ProposalRequest::new(chaincode, function, vec![arg.to_string()], wait);
    let responses = channel.query_by_chaincode(context, &request).await?;

    let mut result = String::new();
    for response in &responses {
        if aggregation == QueryAggregation::RequireAgreement
            && response.payload != responses[0].payload
        {
            warn!(
                chaincode,
                function,
                peer = %response.peer,
                "query payload disagrees with the first responder"
            );
            return Err(GatewayError::QueryMismatch);
        }
        result = String::from_utf8_lossy(&response.payload).into_owned();
    }

    info!(chaincode, function, responders = responses.len(), "query evaluated");
    Ok(result)
}

/// Submit `function(args)` for endorsement and, on unanimous success, hand
/// the full response set to the orderer.
///
/// Returns the commit handle for the in-flight ordering phase; the caller
/// decides whether to await it.
pub async fn invoke_chaincode(
    channel: &Arc<dyn FabricChannel>,
    context: &FabricUser,
    chaincode: &str,
    function: &str,
    args: Vec<String>,
    wait: Duration,
) -> Result<CommitHandle, GatewayError> {
    let request = ProposalRequest::new(chaincode, function, args, wait);
    let responses = channel.send_proposal(context, &request).await?;

    let total = responses.len();
    let mut failed = 0usize;
    for response in &responses {
        if response.is_success() {
            info!(
                transaction_id = %response.transaction_id,
                peer = %response.peer,
                "successful transaction proposal response"
            );
        } else {
            failed += 1;
            warn!(
                transaction_id = %response.transaction_id,
                peer = %response.peer,
                "failed transaction proposal response"
            );
        }
    }

    if failed > 0 {
        return Err(GatewayError::ProposalRejected { failed, total });
    }

    // The orderer gets the complete endorsed set, not just one response.
    let handle = channel.send_to_orderer(context, responses).await?;
    info!(
        chaincode,
        function,
        transaction_id = %handle.transaction_id(),
        "transaction sent to orderer"
    );
    Ok(handle)
}
