// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Capture Session
//!
//! The mobile-side role: authenticates with its pairing token as soon as
//! the connection opens, then uploads captured images. The handshake is
//! two-step: the transport-level open is followed by a protocol-level
//! `auth`, and the session is not authenticated until the relay's `hello`
//! delivers the shared verifier. The role never receives binary frames, so
//! there is no receive-side expectation, only a send-side count of images
//! awaiting acknowledgment.

use std::time::{Duration, Instant};

use super::error::SocketError;
use super::message::{ControlMessage, Frame};
use super::receiver::{mobile_step, MobileReceiverEvent, ProtocolViolation};
use super::transport::{
    CloseInfo, ConnectionState, SocketResult, Transport, TransportConfig, NOT_CONFIGURED_REASON,
};

/// Configuration for a capture session.
#[derive(Debug, Clone)]
pub struct MobileSessionConfig {
    /// Relay URL. `None` puts the session in the permanently closed
    /// "not configured" state, same as the pairing client.
    pub url: Option<String>,
    /// Pairing token scanned from the barcode.
    pub token: String,
    /// Transport tuning (timeouts); the URL field inside is ignored.
    pub transport: TransportConfig,
    /// Interval between liveness pings while connected.
    pub ping_interval: Duration,
}

impl Default for MobileSessionConfig {
    fn default() -> Self {
        MobileSessionConfig {
            url: None,
            token: String::new(),
            transport: TransportConfig::default(),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl MobileSessionConfig {
    /// Creates a config for the given relay URL and pairing token.
    pub fn new(url: &str, token: &str) -> Self {
        MobileSessionConfig {
            url: Some(url.to_string()),
            token: token.to_string(),
            ..Default::default()
        }
    }
}

/// Events surfaced by a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileEvent {
    /// The connection opened and `auth` has been sent.
    Connected,
    /// The relay accepted the token; carries the shared verifier.
    Authenticated { verifier: String },
    /// The relay acknowledged an image; carries the remaining pending count.
    AckReceived { pending: u32 },
    /// Liveness reply from the relay.
    Pong,
    /// The inbound stream violated the protocol; the connection was closed
    /// with the given code.
    ProtocolError { code: u16, reason: String },
    /// The session is closed. Capture sessions never reconnect.
    Closed { reason: String, was_clean: bool },
}

/// Capture session over any transport.
pub struct MobileSession<T: Transport> {
    transport: T,
    config: MobileSessionConfig,
    verifier: Option<String>,
    pending: u32,
    closed: Option<CloseInfo>,
    next_ping_at: Option<Instant>,
}

impl<T: Transport> MobileSession<T> {
    /// Creates a session; call `connect` to start it.
    pub fn new(transport: T, config: MobileSessionConfig) -> Self {
        MobileSession {
            transport,
            config,
            verifier: None,
            pending: 0,
            closed: None,
            next_ping_at: None,
        }
    }

    /// Opens the connection and immediately sends the `auth` message.
    pub fn connect(&mut self) -> Vec<MobileEvent> {
        let mut events = Vec::new();

        let url = match &self.config.url {
            Some(url) => url.clone(),
            None => {
                let info = CloseInfo {
                    code: None,
                    reason: NOT_CONFIGURED_REASON.to_string(),
                    was_clean: true,
                };
                events.push(MobileEvent::Closed {
                    reason: info.reason.clone(),
                    was_clean: info.was_clean,
                });
                self.closed = Some(info);
                return events;
            }
        };

        let mut config = self.config.transport.clone();
        config.url = url;

        if let Err(e) = self.transport.connect(&config) {
            self.terminate(CloseInfo::dropped(e.to_string()), &mut events);
            return events;
        }

        let auth = ControlMessage::Auth {
            token: self.config.token.clone(),
        };
        if let Err(e) = self.send_control(auth) {
            self.terminate(CloseInfo::dropped(e.to_string()), &mut events);
            return events;
        }

        self.next_ping_at = Some(Instant::now() + self.config.ping_interval);
        events.push(MobileEvent::Connected);
        events
    }

    /// Drives the session: sends the liveness ping when due and drains all
    /// frames the transport has ready. Returns nothing once closed.
    pub fn poll(&mut self) -> Vec<MobileEvent> {
        let mut events = Vec::new();
        if self.closed.is_some() {
            return events;
        }

        self.send_ping_if_due(&mut events);

        while self.closed.is_none() {
            match self.transport.receive() {
                Ok(Some(frame)) => self.handle_frame(frame, &mut events),
                Ok(None) => break,
                Err(SocketError::Closed(info)) => self.terminate(info, &mut events),
                Err(e) => self.terminate(CloseInfo::dropped(e.to_string()), &mut events),
            }
        }

        events
    }

    /// Uploads a captured image: announces its content type, then sends the
    /// raw bytes. Fire-and-forget; the relay's `ack` is observed through a
    /// later `AckReceived` event.
    ///
    /// Fails loudly with `SocketError::NotConnected` when the session is
    /// not connected.
    pub fn send_image(&mut self, content_type: &str, data: Vec<u8>) -> SocketResult<()> {
        if self.transport.state() != ConnectionState::Connected {
            return Err(SocketError::NotConnected);
        }
        self.pending += 1;
        self.send_control(ControlMessage::Image {
            content_type: content_type.to_string(),
        })?;
        self.transport.send(Frame::Binary(data))
    }

    /// The verifier confirmed by the relay, once authenticated.
    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// True once the relay has confirmed the token with `hello`.
    pub fn is_authenticated(&self) -> bool {
        self.verifier.is_some()
    }

    /// Number of sent images not yet acknowledged.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// True while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.transport.state() == ConnectionState::Connected
    }

    /// The terminal close, once the session has closed.
    pub fn closed(&self) -> Option<&CloseInfo> {
        self.closed.as_ref()
    }

    /// Convenience accessor for the terminal close reason.
    pub fn closed_reason(&self) -> Option<&str> {
        self.closed.as_ref().map(|info| info.display_reason())
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn send_ping_if_due(&mut self, events: &mut Vec<MobileEvent>) {
        if self.transport.state() != ConnectionState::Connected {
            return;
        }
        let due = self.next_ping_at.is_some_and(|at| Instant::now() >= at);
        if !due {
            return;
        }
        match self.send_control(ControlMessage::Ping) {
            Ok(()) => self.next_ping_at = Some(Instant::now() + self.config.ping_interval),
            Err(SocketError::Closed(info)) => self.terminate(info, events),
            Err(e) => self.terminate(CloseInfo::dropped(e.to_string()), events),
        }
    }

    fn handle_frame(&mut self, frame: Frame, events: &mut Vec<MobileEvent>) {
        match mobile_step(frame) {
            Ok(MobileReceiverEvent::Hello { verifier }) => {
                self.verifier = Some(verifier.clone());
                events.push(MobileEvent::Authenticated { verifier });
            }
            Ok(MobileReceiverEvent::Ack) => {
                // A late or duplicate ack must not corrupt accounting.
                self.pending = self.pending.saturating_sub(1);
                events.push(MobileEvent::AckReceived {
                    pending: self.pending,
                });
            }
            Ok(MobileReceiverEvent::Pong) => events.push(MobileEvent::Pong),
            Err(violation) => self.fail_protocol(violation, events),
        }
    }

    fn fail_protocol(&mut self, violation: ProtocolViolation, events: &mut Vec<MobileEvent>) {
        let _ = self.transport.close_with(violation.code, violation.reason);
        events.push(MobileEvent::ProtocolError {
            code: violation.code,
            reason: violation.reason.to_string(),
        });
        self.terminate(CloseInfo::clean(violation.code, violation.reason), events);
    }

    /// Every close is terminal for the capture role; the ping deadline is
    /// dropped so it cannot fire against a torn-down connection.
    fn terminate(&mut self, info: CloseInfo, events: &mut Vec<MobileEvent>) {
        self.next_ping_at = None;
        let _ = self.transport.disconnect();
        events.push(MobileEvent::Closed {
            reason: info.display_reason().to_string(),
            was_clean: info.was_clean,
        });
        self.closed = Some(info);
    }

    fn send_control(&mut self, msg: ControlMessage) -> SocketResult<()> {
        let text = msg
            .encode()
            .map_err(|e| SocketError::SendFailed(e.to_string()))?;
        self.transport.send(Frame::Text(text))
    }
}
