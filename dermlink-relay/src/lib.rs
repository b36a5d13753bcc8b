//! DermLink Relay Library
//!
//! Accept loop and connection routing, exposed as a library so integration
//! tests can run a real relay on an ephemeral port.

pub mod barcode;
pub mod config;
pub mod handler;
pub mod http;
pub mod pairing;

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, warn};

use config::RelayConfig;
use pairing::PairingRegistry;

/// Runs the WebSocket accept loop until the listener fails.
pub async fn serve(listener: TcpListener, registry: Arc<PairingRegistry>, config: Arc<RelayConfig>) {
    loop {
        match listener.accept().await {
            Ok((stream, _peer_addr)) => {
                tokio::spawn(handle_connection(stream, registry.clone(), config.clone()));
            }
            Err(e) => {
                warn!("accept failed: {}", e);
            }
        }
    }
}

/// Performs the WebSocket handshake and routes by request path.
async fn handle_connection(
    stream: TcpStream,
    registry: Arc<PairingRegistry>,
    config: Arc<RelayConfig>,
) {
    let mut path = String::new();
    let mut origin: Option<String> = None;

    let callback = |req: &Request, response: Response| {
        path = req.uri().path().to_string();
        origin = req
            .headers()
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if path != "/ws/client" && path != "/ws/mobile" {
            let mut not_found = ErrorResponse::new(Some("Not found".to_string()));
            *not_found.status_mut() = StatusCode::NOT_FOUND;
            return Err(not_found);
        }
        Ok(response)
    };

    let ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("handshake failed: {}", e);
            return;
        }
    };

    match path.as_str() {
        "/ws/client" => handler::handle_client(ws, origin, registry, config).await,
        "/ws/mobile" => handler::handle_mobile(ws, origin, registry, config).await,
        // Unknown paths were rejected during the handshake
        _ => {}
    }
}
