// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Runtime Configuration
//!
//! Network parameters for the Managed Blockchain member this gateway talks
//! to. The configuration is loaded from the environment once at startup and
//! passed by `Arc` to every component that needs it; there is no global
//! configuration object.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `NETWORK_ID` | Managed Blockchain network id (also the orderer name) | `n-XXXXXXXXXXXXXX` |
//! | `MEMBER_NAME` | Member/organization name (CA affiliation) | `OrganizationMember1` |
//! | `MEMBER_ID` | Member id (MSP id) | `m-XXXXXXXXXXXXXXX` |
//! | `ADMIN_USER` / `ADMIN_PWD` | CA admin bootstrap credentials | `admin` / `Password123` |
//! | `LAMBDA_USER` / `LAMBDA_USER_PWD` | Application identity used by the facade | `lambdaUser` / `LambdaUserPwd1` |
//! | `CA_ENDPOINT` | Fabric CA host (https is assumed) | unset (dev CA) |
//! | `AMB_TLS_CERT_PATH` | Path to the network TLS trust bundle | `managedblockchain-tls-chain.pem` |
//! | `ORDERER_ENDPOINT` | Ordering service endpoint | unset |
//! | `PEER_ID` / `PEER_ENDPOINT` | Single peer name and endpoint | unset |
//! | `PEER_ENDPOINTS` | Comma list of `name@url` peers (overrides the single peer) | unset |
//! | `CHANNEL_NAME` | Channel to join | `mychannel` |
//! | `PROPOSAL_WAIT_MS` | Endorsement wait for invoke proposals | `2000` |
//! | `QUERY_AGGREGATION` | `last-responder` or `require-agreement` | `last-responder` |
//! | `COMMIT_WAIT_MS` | How long `/invoke` waits for the commit event; unset returns a pending handle | unset |
//! | `DATA_DIR` | Root directory for the file secret store | `/data` |
//! | `HOST` / `PORT` | Server bind address | `0.0.0.0` / `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |

use std::env;
use std::time::Duration;

/// Environment variable name for the secret store directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default endorsement wait for invoke proposals.
pub const DEFAULT_PROPOSAL_WAIT_MS: u64 = 2000;

/// How a multi-peer query response set collapses into one result.
///
/// The inherited behavior is last-responder-wins; it is kept as the default
/// and exposed as a knob rather than silently changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryAggregation {
    /// Return the payload of the last responding peer.
    LastResponder,
    /// Require every peer to return an identical payload.
    RequireAgreement,
}

/// A peer endpoint as configured.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub name: String,
    pub url: String,
}

/// Gateway configuration, constructed once at process start.
#[derive(Debug, Clone)]
pub struct AmbConfig {
    /// Network id; doubles as the orderer name.
    pub network_id: String,
    /// Member/organization name, used as the CA affiliation.
    pub member_name: String,
    /// Member id, used as the MSP id.
    pub member_id: String,
    /// CA admin bootstrap identity.
    pub admin_user: String,
    pub admin_secret: String,
    /// Application identity the REST facade acts as.
    pub app_user: String,
    pub app_user_secret: String,
    /// Fabric CA base URL; `None` selects the in-process dev CA.
    pub ca_url: Option<String>,
    /// Path to the network TLS trust bundle (PEM).
    pub tls_cert_path: String,
    /// Ordering service endpoint.
    pub orderer_url: String,
    /// Peer endpoints for the channel.
    pub peers: Vec<PeerConfig>,
    /// Channel name.
    pub channel_name: String,
    /// Bounded endorsement wait for invoke proposals.
    pub proposal_wait: Duration,
    /// Query response aggregation policy.
    pub query_aggregation: QueryAggregation,
    /// How long invocations wait for the commit event before returning a
    /// pending handle. `None` means return immediately and log the outcome.
    pub commit_wait: Option<Duration>,
}

fn env_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl AmbConfig {
    /// Load the configuration from the environment, falling back to the
    /// sample network defaults.
    pub fn from_env() -> Self {
        let network_id = env_or("NETWORK_ID", "n-XXXXXXXXXXXXXX");

        Self {
            network_id,
            member_name: env_or("MEMBER_NAME", "OrganizationMember1"),
            member_id: env_or("MEMBER_ID", "m-XXXXXXXXXXXXXXX"),
            admin_user: env_or("ADMIN_USER", "admin"),
            admin_secret: env_or("ADMIN_PWD", "Password123"),
            app_user: env_or("LAMBDA_USER", "lambdaUser"),
            app_user_secret: env_or("LAMBDA_USER_PWD", "LambdaUserPwd1"),
            ca_url: env_opt("CA_ENDPOINT").map(|host| {
                if host.starts_with("http") {
                    host
                } else {
                    format!("https://{host}")
                }
            }),
            tls_cert_path: env_or("AMB_TLS_CERT_PATH", "managedblockchain-tls-chain.pem"),
            orderer_url: env_opt("ORDERER_ENDPOINT")
                .map(|host| format!("grpcs://{host}"))
                .unwrap_or_default(),
            peers: parse_peers(),
            channel_name: env_or("CHANNEL_NAME", "mychannel"),
            proposal_wait: Duration::from_millis(
                env_opt("PROPOSAL_WAIT_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PROPOSAL_WAIT_MS),
            ),
            query_aggregation: match env_or("QUERY_AGGREGATION", "last-responder").as_str() {
                "require-agreement" => QueryAggregation::RequireAgreement,
                _ => QueryAggregation::LastResponder,
            },
            commit_wait: env_opt("COMMIT_WAIT_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
        }
    }

    /// The orderer name; Managed Blockchain names the orderer after the
    /// network id.
    pub fn orderer_name(&self) -> &str {
        &self.network_id
    }
}

/// Parse peers from `PEER_ENDPOINTS` (`name@url,name@url`), falling back to
/// the single `PEER_ID`/`PEER_ENDPOINT` pair.
fn parse_peers() -> Vec<PeerConfig> {
    if let Some(list) = env_opt("PEER_ENDPOINTS") {
        return list
            .split(',')
            .filter_map(|entry| {
                let (name, url) = entry.trim().split_once('@')?;
                Some(PeerConfig {
                    name: name.to_string(),
                    url: url.to_string(),
                })
            })
            .collect();
    }

    let name = env_or("PEER_ID", "nd-XXXXXXXXXXXXXXX");
    let url = env_opt("PEER_ENDPOINT")
        .map(|host| format!("grpcs://{host}"))
        .unwrap_or_default();
    vec![PeerConfig { name, url }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sample_network() {
        let config = AmbConfig::from_env();
        assert_eq!(config.channel_name, "mychannel");
        assert_eq!(config.proposal_wait, Duration::from_millis(2000));
        assert_eq!(config.query_aggregation, QueryAggregation::LastResponder);
        assert!(config.commit_wait.is_none());
        assert_eq!(config.orderer_name(), config.network_id);
    }
}
