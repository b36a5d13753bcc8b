// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pairing Client Session
//!
//! The browser-side role: receives the pairing barcode, tracks the paired
//! capture device through its verifier, and accepts relayed images,
//! acknowledging each one. Built from a transport, the frame codec and the
//! receiver state machine.

use std::time::{Duration, Instant};

use super::error::SocketError;
use super::message::{ControlMessage, Frame, ImagePayload};
use super::receiver::{client_step, Expectation, ProtocolViolation, ReceiverEvent};
use super::transport::{
    CloseInfo, ConnectionState, SocketResult, Transport, TransportConfig, NOT_CONFIGURED_REASON,
};

/// Configuration for a pairing client session.
#[derive(Debug, Clone)]
pub struct ClientSessionConfig {
    /// Relay URL. `None` means the deployment has no relay: the session
    /// starts permanently closed with reason "not configured" and never
    /// attempts a connection.
    pub url: Option<String>,
    /// Transport tuning (timeouts); the URL field inside is ignored.
    pub transport: TransportConfig,
    /// Interval between liveness pings while connected.
    pub ping_interval: Duration,
    /// Delay before reconnecting after a retriable close.
    ///
    /// Reconnection retries indefinitely at this fixed delay, with no
    /// backoff growth and no cap. Against a permanently unreachable relay
    /// this dials forever; callers that need to give up must tear the
    /// session down themselves.
    pub reconnect_delay: Duration,
}

impl Default for ClientSessionConfig {
    fn default() -> Self {
        ClientSessionConfig {
            url: None,
            transport: TransportConfig::default(),
            ping_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

impl ClientSessionConfig {
    /// Creates a config for the given relay URL with default timings.
    pub fn for_url(url: &str) -> Self {
        ClientSessionConfig {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }
}

/// Events surfaced by a pairing client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A connection is open; the next frame will be the pairing barcode.
    Connected,
    /// The connection was lost; a reconnect is scheduled.
    Reconnecting,
    /// A capture device paired; carries the shared verifier.
    PeerAttached { verifier: String },
    /// The paired capture device disconnected.
    PeerDetached,
    /// The pairing barcode arrived (always `image/png`).
    BarcodeReceived(ImagePayload),
    /// An announced image arrived; an `ack` has already been sent.
    ImageReceived(ImagePayload),
    /// Liveness reply from the relay.
    Pong,
    /// The inbound stream violated the protocol; the connection was closed
    /// with the given code and will not be retried.
    ProtocolError { code: u16, reason: String },
    /// The session is permanently closed.
    Closed { reason: String, was_clean: bool },
}

/// Pairing client session over any transport.
///
/// Poll-driven: the owner calls `poll()` from one thread; frames are
/// processed strictly in order and the liveness ping is a deadline checked
/// inside `poll()`, so it cannot fire after the connection is gone.
pub struct ClientSession<T: Transport> {
    transport: T,
    config: ClientSessionConfig,
    expectation: Expectation,
    verifier: Option<String>,
    closed: Option<CloseInfo>,
    reconnect_at: Option<Instant>,
    next_ping_at: Option<Instant>,
}

impl<T: Transport> ClientSession<T> {
    /// Creates a session; call `connect` to start it.
    pub fn new(transport: T, config: ClientSessionConfig) -> Self {
        ClientSession {
            transport,
            config,
            expectation: Expectation::BarcodePayload,
            verifier: None,
            closed: None,
            reconnect_at: None,
            next_ping_at: None,
        }
    }

    /// Starts the session.
    ///
    /// With no URL configured this is the documented degraded mode: the
    /// session reports itself closed with reason "not configured" and never
    /// attempts a connection.
    pub fn connect(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if self.config.url.is_none() {
            let info = CloseInfo {
                code: None,
                reason: NOT_CONFIGURED_REASON.to_string(),
                was_clean: true,
            };
            events.push(ClientEvent::Closed {
                reason: info.reason.clone(),
                was_clean: info.was_clean,
            });
            self.closed = Some(info);
            return events;
        }
        self.open_connection(&mut events);
        events
    }

    /// Drives the session: reconnects when due, sends the liveness ping,
    /// and drains all frames the transport has ready, returning the events
    /// they produced. Returns nothing once the session is permanently
    /// closed.
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        if self.closed.is_some() {
            return events;
        }

        if let Some(at) = self.reconnect_at {
            if Instant::now() < at {
                return events;
            }
            self.reconnect_at = None;
            self.open_connection(&mut events);
            if self.closed.is_some() || self.reconnect_at.is_some() {
                return events;
            }
        }

        self.send_ping_if_due(&mut events);

        while self.closed.is_none() && self.reconnect_at.is_none() {
            match self.transport.receive() {
                Ok(Some(frame)) => self.handle_frame(frame, &mut events),
                Ok(None) => break,
                Err(SocketError::Closed(info)) => self.handle_close(info, &mut events),
                Err(e) => self.handle_close(CloseInfo::dropped(e.to_string()), &mut events),
            }
        }

        events
    }

    /// Requests disconnection of the paired capture device.
    pub fn kick(&mut self) -> SocketResult<()> {
        self.send_control(ControlMessage::Kick)
    }

    /// The verifier of the currently paired capture device, if any.
    pub fn verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// True while a connection is open.
    pub fn is_connected(&self) -> bool {
        self.transport.state() == ConnectionState::Connected
    }

    /// The terminal close, once the session has permanently closed.
    pub fn closed(&self) -> Option<&CloseInfo> {
        self.closed.as_ref()
    }

    /// Convenience accessor for the terminal close reason.
    pub fn closed_reason(&self) -> Option<&str> {
        self.closed.as_ref().map(|info| info.display_reason())
    }

    /// The receiver's current expectation.
    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Opens a fresh connection. The expectation and verifier are re-armed
    /// first: no frame from the new connection can ever be evaluated
    /// against leftover state from a superseded one.
    fn open_connection(&mut self, events: &mut Vec<ClientEvent>) {
        self.expectation = Expectation::BarcodePayload;
        self.verifier = None;

        // url checked by connect(); sessions without one never get here
        let url = match &self.config.url {
            Some(url) => url.clone(),
            None => return,
        };
        let mut config = self.config.transport.clone();
        config.url = url;

        match self.transport.connect(&config) {
            Ok(()) => {
                self.next_ping_at = Some(Instant::now() + self.config.ping_interval);
                events.push(ClientEvent::Connected);
            }
            Err(e) => self.handle_close(CloseInfo::dropped(e.to_string()), events),
        }
    }

    fn send_ping_if_due(&mut self, events: &mut Vec<ClientEvent>) {
        if self.transport.state() != ConnectionState::Connected {
            return;
        }
        let due = self
            .next_ping_at
            .is_some_and(|at| Instant::now() >= at);
        if !due {
            return;
        }
        match self.send_control(ControlMessage::Ping) {
            Ok(()) => self.next_ping_at = Some(Instant::now() + self.config.ping_interval),
            Err(SocketError::Closed(info)) => self.handle_close(info, events),
            Err(e) => self.handle_close(CloseInfo::dropped(e.to_string()), events),
        }
    }

    fn handle_frame(&mut self, frame: Frame, events: &mut Vec<ClientEvent>) {
        let state = std::mem::replace(&mut self.expectation, Expectation::Control);
        match client_step(state, frame) {
            Ok(transition) => {
                self.expectation = transition.next;
                if let Some(reply) = transition.reply {
                    match self.send_control(reply) {
                        Ok(()) => {}
                        Err(SocketError::Closed(info)) => {
                            self.handle_close(info, events);
                            return;
                        }
                        Err(e) => {
                            self.handle_close(CloseInfo::dropped(e.to_string()), events);
                            return;
                        }
                    }
                }
                if let Some(event) = transition.event {
                    self.apply_event(event, events);
                }
            }
            Err(violation) => self.fail_protocol(violation, events),
        }
    }

    fn apply_event(&mut self, event: ReceiverEvent, events: &mut Vec<ClientEvent>) {
        match event {
            ReceiverEvent::PeerAttached { verifier } => {
                self.verifier = Some(verifier.clone());
                events.push(ClientEvent::PeerAttached { verifier });
            }
            ReceiverEvent::PeerDetached => {
                // An unpeer for a peer we no longer track (e.g. racing a
                // kick) is a no-op, not an error.
                if self.verifier.take().is_some() {
                    events.push(ClientEvent::PeerDetached);
                }
            }
            ReceiverEvent::BarcodeReceived(payload) => {
                events.push(ClientEvent::BarcodeReceived(payload));
            }
            ReceiverEvent::ImageReceived(payload) => {
                events.push(ClientEvent::ImageReceived(payload));
            }
            ReceiverEvent::Pong => events.push(ClientEvent::Pong),
        }
    }

    /// Protocol violations are unrecoverable desynchronization: close with
    /// the specific code and do not retry.
    fn fail_protocol(&mut self, violation: ProtocolViolation, events: &mut Vec<ClientEvent>) {
        let _ = self.transport.close_with(violation.code, violation.reason);
        self.next_ping_at = None;
        self.reconnect_at = None;
        events.push(ClientEvent::ProtocolError {
            code: violation.code,
            reason: violation.reason.to_string(),
        });
        let info = CloseInfo::clean(violation.code, violation.reason);
        events.push(ClientEvent::Closed {
            reason: info.reason.clone(),
            was_clean: info.was_clean,
        });
        self.closed = Some(info);
    }

    /// Classifies a transport-level close: unclean closes are retriable,
    /// clean closes are terminal. The ping deadline is dropped on every
    /// path so it cannot outlive the connection.
    fn handle_close(&mut self, info: CloseInfo, events: &mut Vec<ClientEvent>) {
        self.next_ping_at = None;
        let _ = self.transport.disconnect();
        if !info.was_clean {
            self.reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
            events.push(ClientEvent::Reconnecting);
        } else {
            events.push(ClientEvent::Closed {
                reason: info.display_reason().to_string(),
                was_clean: info.was_clean,
            });
            self.closed = Some(info);
        }
    }

    fn send_control(&mut self, msg: ControlMessage) -> SocketResult<()> {
        let text = msg
            .encode()
            .map_err(|e| SocketError::SendFailed(e.to_string()))?;
        self.transport.send(Frame::Text(text))
    }
}
