// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-process network backend.
//!
//! Simulates a channel of N peers over a shared key/value ledger: every
//! peer endorses (or refuses) the same proposal, ordering assigns block
//! numbers and resolves commit handles asynchronously. Supports the fabcar
//! sample chaincode shape used by the demo endpoints, plus a generic
//! key/args convention for everything else.
//!
//! Per-peer failure injection exists so the all-or-nothing endorsement
//! policy can be exercised without a real network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    CommitEvent, CommitHandle, Endpoint, FabricChannel, FabricNetwork, NetworkError,
    ProposalRequest, ProposalResponse, ProposalStatus,
};
use crate::identity::FabricUser;

/// Functions treated as reads by the dev chaincode convention.
const READ_PREFIXES: [&str; 3] = ["query", "read", "get"];

/// Simulated write carried inside the endorsement material.
#[derive(Debug, Serialize, Deserialize)]
struct SimulatedWrite {
    chaincode: String,
    key: String,
    value: String,
}

/// In-process ledger shared by every channel of one network instance.
#[derive(Debug, Default)]
struct Ledger {
    state: Mutex<HashMap<String, String>>,
    block_height: AtomicU64,
}

impl Ledger {
    fn read(&self, chaincode: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .expect("ledger poisoned")
            .get(&format!("{chaincode}/{key}"))
            .cloned()
    }

    fn write(&self, chaincode: &str, key: &str, value: String) {
        self.state
            .lock()
            .expect("ledger poisoned")
            .insert(format!("{chaincode}/{key}"), value);
    }

    fn next_block(&self) -> u64 {
        self.block_height.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Development network backend.
#[derive(Default)]
pub struct DevNetwork {
    ledger: Arc<Ledger>,
    faulty_peers: HashSet<String>,
}

impl DevNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark peers that refuse every endorsement.
    pub fn with_faulty_peers<I, S>(peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ledger: Arc::new(Ledger::default()),
            faulty_peers: peers.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl FabricNetwork for DevNetwork {
    async fn connect_channel(
        &self,
        name: &str,
        peers: &[Endpoint],
        orderer: &Endpoint,
    ) -> Result<Arc<dyn FabricChannel>, NetworkError> {
        if peers.is_empty() {
            return Err(NetworkError::Connect(
                "channel needs at least one peer".to_string(),
            ));
        }

        info!(
            channel = name,
            peers = peers.len(),
            orderer = %orderer.name,
            "dev network channel initialized"
        );
        Ok(Arc::new(DevChannel {
            name: name.to_string(),
            peers: peers.iter().map(|p| p.name.clone()).collect(),
            faulty_peers: self.faulty_peers.clone(),
            ledger: self.ledger.clone(),
        }))
    }
}

/// One initialized dev channel.
pub struct DevChannel {
    name: String,
    peers: Vec<String>,
    faulty_peers: HashSet<String>,
    ledger: Arc<Ledger>,
}

impl DevChannel {
    fn is_read(function: &str) -> bool {
        READ_PREFIXES
            .iter()
            .any(|prefix| function.to_ascii_lowercase().starts_with(prefix))
    }

    /// Simulate the chaincode for a write proposal.
    ///
    /// fabcar's `createCar` stores an object with the car fields; anything
    /// else stores the argument tail as a JSON array under `args[0]`.
    fn simulate_write(request: &ProposalRequest) -> Result<SimulatedWrite, String> {
        let key = request
            .args
            .first()
            .filter(|k| !k.is_empty())
            .ok_or("write requires a non-empty key argument")?;

        let value = if request.chaincode == "fabcar"
            && request.function == "createCar"
            && request.args.len() == 5
        {
            serde_json::json!({
                "make": request.args[1],
                "model": request.args[2],
                "colour": request.args[3],
                "owner": request.args[4],
            })
            .to_string()
        } else {
            serde_json::to_string(&request.args[1..]).map_err(|e| e.to_string())?
        };

        Ok(SimulatedWrite {
            chaincode: request.chaincode.clone(),
            key: key.clone(),
            value,
        })
    }

    fn respond(
        &self,
        peer: &str,
        transaction_id: &str,
        request: &ProposalRequest,
    ) -> ProposalResponse {
        if self.faulty_peers.contains(peer) {
            return ProposalResponse {
                peer: peer.to_string(),
                transaction_id: transaction_id.to_string(),
                status: ProposalStatus::Failure,
                payload: Vec::new(),
                endorsement: Vec::new(),
            };
        }

        if Self::is_read(&request.function) {
            let payload = request
                .args
                .first()
                .and_then(|key| self.ledger.read(&request.chaincode, key))
                .unwrap_or_default();
            return ProposalResponse {
                peer: peer.to_string(),
                transaction_id: transaction_id.to_string(),
                status: ProposalStatus::Success,
                payload: payload.into_bytes(),
                endorsement: Vec::new(),
            };
        }

        match Self::simulate_write(request) {
            Ok(write) => {
                let endorsement =
                    serde_json::to_vec(&write).expect("simulated write serializes");
                ProposalResponse {
                    peer: peer.to_string(),
                    transaction_id: transaction_id.to_string(),
                    status: ProposalStatus::Success,
                    payload: write.value.clone().into_bytes(),
                    endorsement,
                }
            }
            Err(message) => {
                debug!(peer, error = %message, "dev peer refused proposal");
                ProposalResponse {
                    peer: peer.to_string(),
                    transaction_id: transaction_id.to_string(),
                    status: ProposalStatus::Failure,
                    payload: message.into_bytes(),
                    endorsement: Vec::new(),
                }
            }
        }
    }
}

#[async_trait]
impl FabricChannel for DevChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_by_chaincode(
        &self,
        _context: &FabricUser,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError> {
        let transaction_id = uuid::Uuid::new_v4().to_string();
        Ok(self
            .peers
            .iter()
            .map(|peer| self.respond(peer, &transaction_id, request))
            .collect())
    }

    async fn send_proposal(
        &self,
        _context: &FabricUser,
        request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError> {
        // One transaction id per proposal, shared across peers.
        let transaction_id = uuid::Uuid::new_v4().to_string();
        Ok(self
            .peers
            .iter()
            .map(|peer| self.respond(peer, &transaction_id, request))
            .collect())
    }

    async fn send_to_orderer(
        &self,
        _context: &FabricUser,
        responses: Vec<ProposalResponse>,
    ) -> Result<CommitHandle, NetworkError> {
        let endorsed = responses
            .iter()
            .find(|r| !r.endorsement.is_empty())
            .ok_or_else(|| {
                NetworkError::Ordering("response set carries no endorsement".to_string())
            })?;

        let write: SimulatedWrite = serde_json::from_slice(&endorsed.endorsement)
            .map_err(|e| NetworkError::Ordering(format!("malformed endorsement: {e}")))?;
        let transaction_id = endorsed.transaction_id.clone();

        let (tx, handle) = CommitHandle::channel(transaction_id.clone());
        let ledger = self.ledger.clone();
        tokio::spawn(async move {
            ledger.write(&write.chaincode, &write.key, write.value);
            let block_number = ledger.next_block();
            info!(%transaction_id, block_number, "dev orderer committed transaction");
            let _ = tx.send(Ok(CommitEvent {
                transaction_id,
                block_number,
            }));
        });

        Ok(handle)
    }
}
