//! Pairing Registry
//!
//! Maps claimable pairing tokens to connected browser sessions. A token is
//! claimable from the moment its barcode is issued until a capture device
//! authenticates with it; claiming removes it, and it is re-armed if the
//! capture device goes away.

use std::collections::HashMap;

use rand::Rng;
use tokio::sync::{mpsc, Mutex};

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use dermlink_core::socket::ControlMessage;

/// Command sent between paired connection tasks.
#[derive(Debug)]
pub enum PeerCommand {
    /// A capture device claimed this session's token; carries the shared
    /// verifier and a handle to reach the device.
    Paired { verifier: String, peer: PeerTx },
    /// Forward a control message to the connection.
    Control(ControlMessage),
    /// Forward raw image bytes to the connection.
    Blob(Vec<u8>),
    /// The paired counterpart went away; the browser session re-arms its
    /// token and tells its user.
    Unpeer,
    /// Close the connection with the given code and reason.
    Close { code: u16, reason: &'static str },
}

/// Handle for delivering commands to a connection task.
pub type PeerTx = mpsc::UnboundedSender<PeerCommand>;

/// A successful claim: the verifier both ends display, and a handle to the
/// browser session.
pub struct ClaimedPeer {
    pub verifier: String,
    pub client: PeerTx,
}

/// Registry of claimable pairing tokens.
pub struct PairingRegistry {
    claimable: Mutex<HashMap<String, PeerTx>>,
}

impl Default for PairingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        PairingRegistry {
            claimable: Mutex::new(HashMap::new()),
        }
    }

    /// Makes a token claimable, bound to a browser session.
    pub async fn register(&self, token: String, client: PeerTx) {
        self.claimable.lock().await.insert(token, client);
    }

    /// Removes a token, e.g. when its browser session disconnects.
    pub async fn unregister(&self, token: &str) {
        self.claimable.lock().await.remove(token);
    }

    /// Claims a token for a capture device.
    ///
    /// On success the token is consumed, a fresh verifier is assigned, and
    /// the browser session is notified that it is paired. Returns `None`
    /// for unknown tokens and for sessions that are already gone.
    pub async fn claim(&self, token: &str, mobile: PeerTx) -> Option<ClaimedPeer> {
        let client = self.claimable.lock().await.remove(token)?;
        let verifier = generate_verifier();
        client
            .send(PeerCommand::Paired {
                verifier: verifier.clone(),
                peer: mobile,
            })
            .ok()?;
        Some(ClaimedPeer { verifier, client })
    }

    /// Tokens currently claimable. Introspection for tests and diagnostics.
    pub async fn claimable_tokens(&self) -> Vec<String> {
        self.claimable.lock().await.keys().cloned().collect()
    }
}

/// Generates a URL-safe pairing token (24 random bytes).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// Generates the 4-digit verifier both ends display after pairing.
pub fn generate_verifier() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}
