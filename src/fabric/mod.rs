// SPDX-License-Identifier: AGPL-3.0-or-later

//! Network boundary: peers, orderer, channels and proposals.
//!
//! Everything behind these traits is an opaque network operation; the
//! gateway only observes response status codes and commit events. The wire
//! protocol itself is out of scope: an SDK-backed implementation plugs in
//! here, and [`dev::DevNetwork`] provides a functional in-process backend
//! for development and tests.

pub mod dev;

pub use dev::DevNetwork;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::identity::FabricUser;

/// Errors from network operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Endpoint construction or channel connection failed.
    #[error("channel connection failed: {0}")]
    Connect(String),

    /// Proposal transmission failed before any peer answered.
    #[error("proposal transmission failed: {0}")]
    Proposal(String),

    /// The ordering service refused or lost the transaction.
    #[error("ordering failed: {0}")]
    Ordering(String),

    /// The commit notification channel closed without a verdict.
    #[error("ordering aborted without a commit event")]
    OrderingAborted,
}

/// A peer or orderer endpoint with its TLS negotiation material.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    /// PEM trust bundle used for TLS negotiation with this endpoint.
    pub tls_root_pem: String,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        tls_root_pem: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            tls_root_pem: tls_root_pem.into(),
        }
    }
}

/// A chaincode proposal, for either the query or the endorsement path.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    pub chaincode: String,
    pub function: String,
    pub args: Vec<String>,
    /// Bounded wait for endorsement responses.
    pub wait: Duration,
}

impl ProposalRequest {
    pub fn new(
        chaincode: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
        wait: Duration,
    ) -> Self {
        Self {
            chaincode: chaincode.into(),
            function: function.into(),
            args,
            wait,
        }
    }
}

/// Status a peer attaches to its proposal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProposalStatus {
    Success,
    Failure,
}

/// One peer's signed simulation result for a proposal.
#[derive(Debug, Clone)]
pub struct ProposalResponse {
    /// Name of the responding peer.
    pub peer: String,
    /// Transaction id assigned to the proposal.
    pub transaction_id: String,
    pub status: ProposalStatus,
    /// Chaincode action response payload.
    pub payload: Vec<u8>,
    /// Opaque endorsement material carried through to ordering.
    pub endorsement: Vec<u8>,
}

impl ProposalResponse {
    pub fn is_success(&self) -> bool {
        self.status == ProposalStatus::Success
    }
}

/// Commit notification from the ordering service.
#[derive(Debug, Clone)]
pub struct CommitEvent {
    pub transaction_id: String,
    /// Number of the block the transaction was committed in.
    pub block_number: u64,
}

/// Future for an in-flight ordering phase.
///
/// Commitment is asynchronous; this handle makes its outcome observable
/// instead of fire-and-forget. Dropping the handle abandons observation,
/// not the transaction.
#[derive(Debug)]
pub struct CommitHandle {
    transaction_id: String,
    rx: oneshot::Receiver<Result<CommitEvent, NetworkError>>,
}

impl CommitHandle {
    /// Create a handle and the sender that resolves it.
    pub fn channel(
        transaction_id: impl Into<String>,
    ) -> (
        oneshot::Sender<Result<CommitEvent, NetworkError>>,
        CommitHandle,
    ) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            CommitHandle {
                transaction_id: transaction_id.into(),
                rx,
            },
        )
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// Wait for the commit verdict.
    pub async fn wait(self) -> Result<CommitEvent, NetworkError> {
        self.rx.await.map_err(|_| NetworkError::OrderingAborted)?
    }

    /// Wait up to `timeout` for the commit verdict.
    ///
    /// An elapsed wait returns the handle so the verdict can still be
    /// observed later; the ordering phase itself is unaffected.
    pub async fn wait_timeout(mut self, timeout: Duration) -> CommitWait {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(Ok(event))) => CommitWait::Committed(event),
            Ok(Ok(Err(e))) => CommitWait::Failed(e),
            Ok(Err(_closed)) => CommitWait::Failed(NetworkError::OrderingAborted),
            Err(_elapsed) => CommitWait::Pending(self),
        }
    }
}

/// Outcome of a bounded commit wait.
#[derive(Debug)]
pub enum CommitWait {
    /// The orderer committed within the window.
    Committed(CommitEvent),
    /// Ordering failed.
    Failed(NetworkError),
    /// Still in flight; the handle comes back for continued observation.
    Pending(CommitHandle),
}

/// Constructor for channels on a concrete network backend.
#[async_trait]
pub trait FabricNetwork: Send + Sync {
    /// Connect and initialize the named channel over the given topology.
    async fn connect_channel(
        &self,
        name: &str,
        peers: &[Endpoint],
        orderer: &Endpoint,
    ) -> Result<Arc<dyn FabricChannel>, NetworkError>;
}

/// An initialized channel.
///
/// ## Contract
///
/// - `query_by_chaincode` evaluates on the query path only; nothing reaches
///   the orderer.
/// - `send_proposal` returns one response per peer, each tagged with status
///   and transaction id.
/// - `send_to_orderer` consumes the full endorsed response set and resolves
///   the returned [`CommitHandle`] asynchronously.
#[async_trait]
pub trait FabricChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn query_by_chaincode(
        &self,
        context: &FabricUser,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError>;

    async fn send_proposal(
        &self,
        context: &FabricUser,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError>;

    async fn send_to_orderer(
        &self,
        context: &FabricUser,
        responses: Vec<ProposalResponse>,
    ) -> Result<CommitHandle, NetworkError>;
}
