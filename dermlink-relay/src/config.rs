//! Relay Configuration
//!
//! Configuration from environment variables, with defaults suitable for
//! local development.

use std::env;
use std::net::SocketAddr;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address for the WebSocket endpoints.
    pub listen_addr: SocketAddr,
    /// Address for the HTTP health endpoints.
    pub http_addr: SocketAddr,
    /// Base URL of the mobile capture page; the pairing token is appended
    /// to form the URL encoded in the barcode.
    pub mobile_url: String,
    /// Permitted HTTP origins for browser connections. An empty list
    /// refuses every browser connection.
    pub origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            listen_addr: "127.0.0.1:5003".parse().expect("static address"),
            http_addr: "127.0.0.1:8081".parse().expect("static address"),
            mobile_url: "http://127.0.0.1:5000/remote/".to_string(),
            origins: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Loads configuration from `DERMLINK_RELAY_*` environment variables,
    /// falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = RelayConfig::default();

        let listen_addr = env::var("DERMLINK_RELAY_LISTEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.listen_addr);
        let http_addr = env::var("DERMLINK_RELAY_HTTP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.http_addr);
        let origins = env::var("DERMLINK_RELAY_ORIGINS")
            .map(|s| parse_origins(&s))
            .unwrap_or_default();
        let mobile_url = derive_mobile_url(env::var("DERMLINK_RELAY_MOBILE_URL").ok(), &origins)
            .unwrap_or(defaults.mobile_url);

        RelayConfig {
            listen_addr,
            http_addr,
            mobile_url,
            origins,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// The barcode URL base: explicit configuration wins, otherwise the mobile
/// page is assumed to live under the first permitted origin.
fn derive_mobile_url(explicit: Option<String>, origins: &[String]) -> Option<String> {
    let url = match explicit {
        Some(url) => url,
        None => format!("{}/remote/", origins.first()?),
    };
    if url.ends_with('/') {
        Some(url)
    } else {
        Some(format!("{}/", url))
    }
}
