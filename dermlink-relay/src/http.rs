//! HTTP Server for Health Endpoints
//!
//! Small REST sidecar for monitoring; the protocol itself lives entirely on
//! the WebSocket listener.

use std::time::Instant;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub start_time: Instant,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Creates the HTTP router with the health endpoints.
pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(root_handler))
        .with_state(state)
}

/// Root handler - returns basic info.
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "dermlink-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health"]
    }))
}

/// Health check endpoint - always returns 200 if the server is running.
async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
