// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared fixtures for unit tests: a sample-network configuration, counting
//! doubles for the CA and network boundaries, and a recording channel that
//! replays canned proposal responses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use p256::elliptic_curve::rand_core::OsRng;
use p256::SecretKey;

use crate::ca::{CaError, CertificateAuthority, RegistrationRequest};
use crate::config::{AmbConfig, PeerConfig, QueryAggregation};
use crate::fabric::{
    CommitEvent, CommitHandle, Endpoint, FabricChannel, FabricNetwork, NetworkError,
    ProposalRequest, ProposalResponse, ProposalStatus,
};
use crate::identity::{Enrollment, FabricUser};

pub fn test_config() -> AmbConfig {
    AmbConfig {
        network_id: "n-TESTNET".to_string(),
        member_name: "OrganizationMember1".to_string(),
        member_id: "m-TESTMSP".to_string(),
        admin_user: "admin".to_string(),
        admin_secret: "Password123".to_string(),
        app_user: "lambdaUser".to_string(),
        app_user_secret: "LambdaUserPwd1".to_string(),
        ca_url: None,
        tls_cert_path: "/nonexistent/tls-chain.pem".to_string(),
        orderer_url: "grpcs://orderer.test:30001".to_string(),
        peers: vec![
            PeerConfig {
                name: "peer-1".to_string(),
                url: "grpcs://peer-1.test:30003".to_string(),
            },
            PeerConfig {
                name: "peer-2".to_string(),
                url: "grpcs://peer-2.test:30003".to_string(),
            },
        ],
        channel_name: "mychannel".to_string(),
        proposal_wait: Duration::from_millis(2000),
        query_aggregation: QueryAggregation::LastResponder,
        commit_wait: None,
    }
}

/// Application state over the dev CA, dev network and an in-memory store.
pub fn dev_state() -> crate::state::AppState {
    use std::sync::Arc;

    let config = Arc::new(test_config());
    let store: Arc<dyn crate::secrets::SecretStore> =
        Arc::new(crate::secrets::MemorySecretStore::new());
    let gateway = crate::gateway::FabricGateway::new(
        config.clone(),
        store.clone(),
        Arc::new(crate::ca::DevCa::new(&config.admin_user, &config.admin_secret)),
        Arc::new(crate::fabric::DevNetwork::new()),
    );
    crate::state::AppState::new(gateway, store)
}

/// A user with a fresh key and placeholder certificate.
pub fn test_user(user_id: &str) -> FabricUser {
    let key = SecretKey::random(&mut OsRng);
    let enrollment = Enrollment::new(
        key,
        format!("-----BEGIN CERTIFICATE-----\n{user_id}\n-----END CERTIFICATE-----\n"),
    );
    FabricUser::new(user_id, "OrganizationMember1", "m-TESTMSP", enrollment)
}

/// `n` peer endpoints named `peer-1..peer-n` plus an orderer.
pub fn endpoints(n: usize) -> (Vec<Endpoint>, Endpoint) {
    let peers = (1..=n)
        .map(|i| Endpoint::new(format!("peer-{i}"), format!("grpcs://peer-{i}.test"), ""))
        .collect();
    let orderer = Endpoint::new("n-TESTNET", "grpcs://orderer.test", "");
    (peers, orderer)
}

/// CA double that counts calls and mints distinct enrollments.
pub struct CountingCa {
    reject: bool,
    enrolls: AtomicUsize,
    registers: AtomicUsize,
}

impl CountingCa {
    pub fn new() -> Self {
        Self {
            reject: false,
            enrolls: AtomicUsize::new(0),
            registers: AtomicUsize::new(0),
        }
    }

    /// A CA that rejects every request.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn enroll_calls(&self) -> usize {
        self.enrolls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.registers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateAuthority for CountingCa {
    async fn enroll(&self, user_id: &str, _secret: &str) -> Result<Enrollment, CaError> {
        let n = self.enrolls.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(CaError::Rejected {
                message: format!("authorization failure for {user_id}"),
            });
        }
        let key = SecretKey::random(&mut OsRng);
        Ok(Enrollment::new(
            key,
            format!("-----BEGIN CERTIFICATE-----\n{user_id}-{n}\n-----END CERTIFICATE-----\n"),
        ))
    }

    async fn register(
        &self,
        request: &RegistrationRequest,
        _registrar: &FabricUser,
    ) -> Result<String, CaError> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            return Err(CaError::Rejected {
                message: format!("registration refused for {}", request.user_id),
            });
        }
        Ok(request.secret.clone())
    }
}

/// Network double that counts channel connections.
pub struct CountingNetwork {
    fail_first: bool,
    connects: AtomicUsize,
    orderer_tls: Mutex<Option<String>>,
}

impl CountingNetwork {
    pub fn new() -> Self {
        Self {
            fail_first: false,
            connects: AtomicUsize::new(0),
            orderer_tls: Mutex::new(None),
        }
    }

    /// Fails the first connection attempt, succeeds afterwards.
    pub fn failing_first() -> Self {
        Self {
            fail_first: true,
            ..Self::new()
        }
    }

    pub fn connect_calls(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Trust material seen on the last orderer endpoint.
    pub fn orderer_tls(&self) -> Option<String> {
        self.orderer_tls.lock().expect("record poisoned").clone()
    }
}

#[async_trait]
impl FabricNetwork for CountingNetwork {
    async fn connect_channel(
        &self,
        name: &str,
        _peers: &[Endpoint],
        orderer: &Endpoint,
    ) -> Result<std::sync::Arc<dyn FabricChannel>, NetworkError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_first && n == 0 {
            return Err(NetworkError::Connect("injected failure".to_string()));
        }
        *self.orderer_tls.lock().expect("record poisoned") =
            Some(orderer.tls_root_pem.clone());
        Ok(std::sync::Arc::new(RecordingChannel::named(name)))
    }
}

/// Channel double replaying canned responses and recording ordering calls.
pub struct RecordingChannel {
    name: String,
    query_payloads: Vec<(String, String)>,
    endorsements: Vec<bool>,
    ordered: Mutex<Vec<usize>>,
}

impl RecordingChannel {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            query_payloads: Vec::new(),
            endorsements: Vec::new(),
            ordered: Mutex::new(Vec::new()),
        }
    }

    /// One responding peer per payload, answering in order.
    pub fn with_query_payloads(payloads: &[&str]) -> Self {
        Self {
            query_payloads: payloads
                .iter()
                .enumerate()
                .map(|(i, p)| (format!("peer-{}", i + 1), p.to_string()))
                .collect(),
            ..Self::named("mychannel")
        }
    }

    /// Explicit (peer, payload) pairs; peer names may repeat.
    pub fn with_named_query_payloads(payloads: &[(&str, &str)]) -> Self {
        Self {
            query_payloads: payloads
                .iter()
                .map(|(peer, p)| (peer.to_string(), p.to_string()))
                .collect(),
            ..Self::named("mychannel")
        }
    }

    /// One peer per flag; `true` endorses, `false` refuses.
    pub fn with_endorsements(outcomes: &[bool]) -> Self {
        Self {
            endorsements: outcomes.to_vec(),
            ..Self::named("mychannel")
        }
    }

    pub fn ordered_sets(&self) -> usize {
        self.ordered.lock().expect("record poisoned").len()
    }

    pub fn last_ordered_size(&self) -> Option<usize> {
        self.ordered.lock().expect("record poisoned").last().copied()
    }

    fn response(peer: &str, success: bool, payload: &str) -> ProposalResponse {
        ProposalResponse {
            peer: peer.to_string(),
            transaction_id: "tx-test".to_string(),
            status: if success {
                ProposalStatus::Success
            } else {
                ProposalStatus::Failure
            },
            payload: payload.as_bytes().to_vec(),
            endorsement: Vec::new(),
        }
    }
}

#[async_trait]
impl FabricChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_by_chaincode(
        &self,
        _context: &FabricUser,
        _request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError> {
        Ok(self
            .query_payloads
            .iter()
            .map(|(peer, payload)| Self::response(peer, true, payload))
            .collect())
    }

    async fn send_proposal(
        &self,
        _context: &FabricUser,
        _request: &ProposalRequest,
    ) -> Result<Vec<ProposalResponse>, NetworkError> {
        Ok(self
            .endorsements
            .iter()
            .enumerate()
            .map(|(i, &success)| Self::response(&format!("peer-{}", i + 1), success, ""))
            .collect())
    }

    async fn send_to_orderer(
        &self,
        _context: &FabricUser,
        responses: Vec<ProposalResponse>,
    ) -> Result<CommitHandle, NetworkError> {
        self.ordered
            .lock()
            .expect("record poisoned")
            .push(responses.len());

        let transaction_id = responses
            .first()
            .map(|r| r.transaction_id.clone())
            .unwrap_or_else(|| "tx-test".to_string());
        let (tx, handle) = CommitHandle::channel(transaction_id.clone());
        let _ = tx.send(Ok(CommitEvent {
            transaction_id,
            block_number: 1,
        }));
        Ok(handle)
    }
}
