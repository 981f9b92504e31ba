// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use fabric_gateway_server::api::router;
use fabric_gateway_server::ca::{CertificateAuthority, DevCa, FabricCaClient};
use fabric_gateway_server::config::{AmbConfig, DATA_DIR_ENV};
use fabric_gateway_server::fabric::DevNetwork;
use fabric_gateway_server::gateway::FabricGateway;
use fabric_gateway_server::secrets::{FileSecretStore, SecretStore};
use fabric_gateway_server::state::AppState;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn certificate_authority(config: &AmbConfig) -> Arc<dyn CertificateAuthority> {
    match &config.ca_url {
        Some(url) => {
            let tls_root = std::fs::read_to_string(&config.tls_cert_path).ok();
            let client = FabricCaClient::new(url, tls_root.as_deref())
                .expect("Failed to construct Fabric CA client");
            info!(ca = %url, "using Fabric CA");
            Arc::new(client)
        }
        None => {
            info!("CA_ENDPOINT not set, using in-process dev CA");
            Arc::new(DevCa::new(&config.admin_user, &config.admin_secret))
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = Arc::new(AmbConfig::from_env());

    let data_dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string());
    let mut store = FileSecretStore::new(&data_dir);
    store
        .initialize()
        .expect("Failed to initialize secret store directory");
    let store: Arc<dyn SecretStore> = Arc::new(store);

    let ca = certificate_authority(&config);
    let gateway = FabricGateway::new(
        config.clone(),
        store.clone(),
        ca,
        Arc::new(DevNetwork::new()),
    );

    let state = AppState::new(gateway, store);
    let app = router(state);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    info!(
        network_id = %config.network_id,
        member = %config.member_name,
        channel = %config.channel_name,
        "Fabric gateway listening on http://{addr} (docs at /docs)"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install shutdown signal handler");
    info!("shutdown signal received");
}
