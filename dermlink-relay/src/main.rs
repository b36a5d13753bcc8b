//! DermLink Relay Server
//!
//! Pairs browser sessions with mobile capture devices and relays captured
//! images between them:
//! - WebSocket endpoints for the pairing (`/ws/client`) and capture
//!   (`/ws/mobile`) roles
//! - QR pairing barcodes with single-use tokens
//! - HTTP endpoints for health checks

use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tracing::{info, warn};

use dermlink_relay::config::RelayConfig;
use dermlink_relay::http::{create_router, HttpState};
use dermlink_relay::pairing::PairingRegistry;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dermlink_relay=info".parse().expect("static directive")),
        )
        .init();

    let config = Arc::new(RelayConfig::from_env());
    info!(
        "Starting DermLink Relay Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("WebSocket: {}", config.listen_addr);
    info!("HTTP (health): {}", config.http_addr);
    info!("Mobile URL: {}", config.mobile_url);
    if config.origins.is_empty() {
        warn!("no permitted origins configured; every connection will be refused");
    }

    let registry = Arc::new(PairingRegistry::new());

    // Start HTTP server for health checks
    let http_router = create_router(HttpState {
        start_time: Instant::now(),
    });
    let http_listener = TcpListener::bind(config.http_addr)
        .await
        .expect("Failed to bind HTTP listener");
    tokio::spawn(async move {
        axum::serve(http_listener, http_router)
            .await
            .expect("HTTP server failed");
    });

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .expect("Failed to bind WebSocket listener");
    dermlink_relay::serve(listener, registry, config).await;
}
