// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Connection Handlers
//!
//! One task per connection. Browser sessions get a barcode and a claimable
//! token; capture devices authenticate with that token and relay images
//! through to their paired browser. Paired tasks talk to each other through
//! unbounded command channels, never directly.

use std::borrow::Cow;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use dermlink_core::socket::{ControlMessage, CLOSE_UNEXPECTED_MESSAGE};

use crate::barcode::pairing_barcode;
use crate::config::RelayConfig;
use crate::pairing::{generate_token, PairingRegistry, PeerCommand, PeerTx};

type Ws = WebSocketStream<TcpStream>;

/// Close code for prohibited origins and failed authentication.
const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Close code for ordinary relay-initiated closes (kick, peer teardown).
const CLOSE_NORMAL: u16 = 1000;

/// Receive states of a capture connection, mirroring the capture client's
/// send sequence: an `image` announcement, then the raw bytes.
enum MobileState {
    Authenticating,
    Running,
    SendingImage { content_type: String },
}

/// Handles a browser pairing connection (`/ws/client`).
pub async fn handle_client(
    mut ws: Ws,
    origin: Option<String>,
    registry: Arc<PairingRegistry>,
    config: Arc<RelayConfig>,
) {
    if !origin_allowed(&config, origin.as_deref()) {
        warn!("client origin prohibited: {:?}", origin);
        close_with(&mut ws, CLOSE_POLICY_VIOLATION, "Origin prohibited").await;
        return;
    }

    let token = generate_token();
    let barcode = match pairing_barcode(&format!("{}{}", config.mobile_url, token)) {
        Ok(png) => png,
        Err(e) => {
            warn!("barcode render failed: {}", e);
            close_with(&mut ws, 1011, "Internal error").await;
            return;
        }
    };
    if ws.send(Message::Binary(barcode)).await.is_err() {
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.register(token.clone(), tx.clone()).await;
    info!("client connected, pairing open");

    let mut peer: Option<PeerTx> = None;

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(PeerCommand::Paired { verifier, peer: mobile }) => {
                    peer = Some(mobile);
                    info!("client paired, verifier {}", verifier);
                    if !send_control(&mut ws, &ControlMessage::Peer { verifier }).await {
                        break;
                    }
                }
                Some(PeerCommand::Control(msg)) => {
                    if !send_control(&mut ws, &msg).await {
                        break;
                    }
                }
                Some(PeerCommand::Blob(data)) => {
                    if ws.send(Message::Binary(data)).await.is_err() {
                        break;
                    }
                }
                Some(PeerCommand::Unpeer) => {
                    peer = None;
                    registry.register(token.clone(), tx.clone()).await;
                    info!("client unpaired, pairing reopened");
                    if !send_control(&mut ws, &ControlMessage::Unpeer).await {
                        break;
                    }
                }
                Some(PeerCommand::Close { code, reason }) => {
                    close_with(&mut ws, code, reason).await;
                    break;
                }
                None => break,
            },
            frame = ws.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!("client socket error: {}", e);
                        break;
                    }
                    None => break,
                };
                match msg {
                    Message::Text(text) => match ControlMessage::decode(&text) {
                        Ok(ControlMessage::Ack) => {
                            if let Some(peer) = &peer {
                                let _ = peer.send(PeerCommand::Control(ControlMessage::Ack));
                            }
                        }
                        Ok(ControlMessage::Kick) => {
                            if let Some(peer) = &peer {
                                let _ = peer.send(PeerCommand::Close {
                                    code: CLOSE_NORMAL,
                                    reason: "Connection terminated by client",
                                });
                            }
                        }
                        Ok(ControlMessage::Ping) => {
                            if !send_control(&mut ws, &ControlMessage::Pong).await {
                                break;
                            }
                        }
                        _ => {
                            close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Protocol error").await;
                            break;
                        }
                    },
                    Message::Binary(_) => {
                        close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Protocol error").await;
                        break;
                    }
                    Message::Close(_) => break,
                    // WebSocket-level ping/pong is answered by the library
                    _ => {}
                }
            },
        }
    }

    registry.unregister(&token).await;
    if let Some(peer) = peer {
        let _ = peer.send(PeerCommand::Close {
            code: CLOSE_NORMAL,
            reason: "Session closed",
        });
    }
    info!("client disconnected");
}

/// Handles a mobile capture connection (`/ws/mobile`).
pub async fn handle_mobile(
    mut ws: Ws,
    origin: Option<String>,
    registry: Arc<PairingRegistry>,
    config: Arc<RelayConfig>,
) {
    if !origin_allowed(&config, origin.as_deref()) {
        warn!("mobile origin prohibited: {:?}", origin);
        close_with(&mut ws, CLOSE_POLICY_VIOLATION, "Origin prohibited").await;
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut client: Option<PeerTx> = None;
    let mut state = MobileState::Authenticating;

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(PeerCommand::Control(msg)) => {
                    if !send_control(&mut ws, &msg).await {
                        break;
                    }
                }
                Some(PeerCommand::Close { code, reason }) => {
                    close_with(&mut ws, code, reason).await;
                    break;
                }
                // Paired/Blob/Unpeer are never addressed to capture devices
                Some(_) => {}
                None => break,
            },
            frame = ws.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!("mobile socket error: {}", e);
                        break;
                    }
                    None => break,
                };
                state = match (state, msg) {
                    (_, Message::Close(_)) => break,
                    (s, Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => s,

                    (MobileState::Authenticating, Message::Text(text)) => {
                        match ControlMessage::decode(&text) {
                            Ok(ControlMessage::Auth { token }) => {
                                match registry.claim(&token, tx.clone()).await {
                                    Some(claimed) => {
                                        client = Some(claimed.client);
                                        info!("mobile authenticated, verifier {}", claimed.verifier);
                                        if !send_control(&mut ws, &ControlMessage::Hello {
                                            verifier: claimed.verifier,
                                        })
                                        .await
                                        {
                                            break;
                                        }
                                        MobileState::Running
                                    }
                                    None => {
                                        close_with(
                                            &mut ws,
                                            CLOSE_POLICY_VIOLATION,
                                            "Authentication failed",
                                        )
                                        .await;
                                        break;
                                    }
                                }
                            }
                            _ => {
                                close_with(
                                    &mut ws,
                                    CLOSE_UNEXPECTED_MESSAGE,
                                    "Authentication required",
                                )
                                .await;
                                break;
                            }
                        }
                    }
                    (MobileState::Authenticating, Message::Binary(_)) => {
                        close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Authentication required")
                            .await;
                        break;
                    }

                    (MobileState::Running, Message::Text(text)) => {
                        match ControlMessage::decode(&text) {
                            Ok(ControlMessage::Image { content_type }) => {
                                MobileState::SendingImage { content_type }
                            }
                            Ok(ControlMessage::Ping) => {
                                if !send_control(&mut ws, &ControlMessage::Pong).await {
                                    break;
                                }
                                MobileState::Running
                            }
                            _ => {
                                close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Protocol error")
                                    .await;
                                break;
                            }
                        }
                    }
                    (MobileState::Running, Message::Binary(_)) => {
                        close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Protocol error").await;
                        break;
                    }

                    (MobileState::SendingImage { content_type }, Message::Binary(data)) => {
                        if let Some(client) = &client {
                            let _ = client.send(PeerCommand::Control(ControlMessage::Image {
                                content_type,
                            }));
                            let _ = client.send(PeerCommand::Blob(data));
                        }
                        MobileState::Running
                    }
                    (MobileState::SendingImage { .. }, Message::Text(_)) => {
                        close_with(&mut ws, CLOSE_UNEXPECTED_MESSAGE, "Protocol error").await;
                        break;
                    }
                };
            },
        }
    }

    if let Some(client) = client {
        let _ = client.send(PeerCommand::Unpeer);
    }
    info!("mobile disconnected");
}

fn origin_allowed(config: &RelayConfig, origin: Option<&str>) -> bool {
    match origin {
        Some(origin) => {
            let origin = origin.trim_end_matches('/');
            config.origins.iter().any(|allowed| allowed == origin)
        }
        None => false,
    }
}

async fn send_control(ws: &mut Ws, msg: &ControlMessage) -> bool {
    let Ok(text) = msg.encode() else {
        return false;
    };
    ws.send(Message::Text(text)).await.is_ok()
}

async fn close_with(ws: &mut Ws, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: Cow::Borrowed(reason),
    };
    let _ = ws.send(Message::Close(Some(frame))).await;
}
