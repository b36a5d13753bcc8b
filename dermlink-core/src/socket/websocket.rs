// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Real transport implementation using tungstenite. Frames pass through
//! untyped: classification of binary frames belongs to the receiver state
//! machine, not the transport.

use std::borrow::Cow;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::TlsConnector;
use tungstenite::client::IntoClientRequest;
use tungstenite::error::ProtocolError;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::CloseFrame;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::error::SocketError;
use super::message::Frame;
use super::transport::{CloseInfo, ConnectionState, SocketResult, Transport, TransportConfig};

/// WebSocket transport for relay communication.
///
/// Supports both ws:// (plaintext) and wss:// (TLS) connections. The read
/// timeout from the config turns blocking reads into a polling interface.
pub struct WebSocketTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    state: ConnectionState,
}

impl WebSocketTransport {
    /// Creates a new, disconnected WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport {
            socket: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Parses a WebSocket URL into host, port and TLS flag.
    fn parse_url(url: &str) -> Result<(String, u16, bool), SocketError> {
        let is_tls = url.starts_with("wss://");
        let url_without_scheme = url
            .strip_prefix("wss://")
            .or_else(|| url.strip_prefix("ws://"))
            .ok_or_else(|| {
                SocketError::ConnectionFailed(
                    "Invalid URL scheme (expected ws:// or wss://)".into(),
                )
            })?;

        let host_port = url_without_scheme
            .split('/')
            .next()
            .unwrap_or(url_without_scheme);

        let (host, port) = if let Some(colon_pos) = host_port.rfind(':') {
            let host = &host_port[..colon_pos];
            let port_str = &host_port[colon_pos + 1..];
            let port: u16 = port_str.parse().map_err(|_| {
                SocketError::ConnectionFailed(format!("Invalid port: {}", port_str))
            })?;
            (host.to_string(), port)
        } else {
            let default_port = if is_tls { 443 } else { 80 };
            (host_port.to_string(), default_port)
        };

        Ok((host, port, is_tls))
    }

    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, SocketError> {
        let connector = TlsConnector::new()
            .map_err(|e| SocketError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| SocketError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        Ok(MaybeTlsStream::NativeTls(tls_stream))
    }

    fn mark_closed(&mut self) {
        self.socket = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, config: &TransportConfig) -> SocketResult<()> {
        if matches!(self.state, ConnectionState::Connected) {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        let (host, port, is_tls) = Self::parse_url(&config.url).inspect_err(|_| {
            self.state = ConnectionState::Disconnected;
        })?;

        let mut addrs = (host.as_str(), port).to_socket_addrs().map_err(|e| {
            self.state = ConnectionState::Disconnected;
            SocketError::ConnectionFailed(e.to_string())
        })?;
        let addr = match addrs.next() {
            Some(addr) => addr,
            None => {
                self.state = ConnectionState::Disconnected;
                return Err(SocketError::ConnectionFailed(format!(
                    "No address for {}",
                    host
                )));
            }
        };

        let tcp_stream = TcpStream::connect_timeout(
            &addr,
            Duration::from_millis(config.connect_timeout_ms),
        )
        .map_err(|e| {
            self.state = ConnectionState::Disconnected;
            SocketError::ConnectionFailed(e.to_string())
        })?;

        tcp_stream
            .set_read_timeout(Some(Duration::from_millis(config.io_timeout_ms)))
            .map_err(|e| SocketError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(Some(Duration::from_millis(config.connect_timeout_ms)))
            .map_err(|e| SocketError::ConnectionFailed(e.to_string()))?;

        let stream: MaybeTlsStream<TcpStream> = if is_tls {
            Self::create_tls_stream(&host, tcp_stream).inspect_err(|_| {
                self.state = ConnectionState::Disconnected;
            })?
        } else {
            MaybeTlsStream::Plain(tcp_stream)
        };

        let request = config.url.as_str().into_client_request().map_err(|e| {
            self.state = ConnectionState::Disconnected;
            SocketError::ConnectionFailed(format!("Invalid WebSocket request: {}", e))
        })?;

        let (socket, _response) = tungstenite::client(request, stream).map_err(|e| {
            self.state = ConnectionState::Disconnected;
            SocketError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
        })?;

        self.socket = Some(socket);
        self.state = ConnectionState::Connected;

        Ok(())
    }

    fn disconnect(&mut self) -> SocketResult<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn close_with(&mut self, code: u16, reason: &str) -> SocketResult<()> {
        if let Some(mut socket) = self.socket.take() {
            let frame = CloseFrame {
                code: CloseCode::from(code),
                reason: Cow::Owned(reason.to_string()),
            };
            let _ = socket.close(Some(frame));
            let _ = socket.flush();
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    fn send(&mut self, frame: Frame) -> SocketResult<()> {
        let socket = self.socket.as_mut().ok_or(SocketError::NotConnected)?;

        let ws_message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };

        let result = socket.send(ws_message).and_then(|_| socket.flush());
        match result {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.mark_closed();
                Err(SocketError::Closed(CloseInfo::dropped(
                    "connection closed during send",
                )))
            }
            Err(e) => Err(SocketError::SendFailed(e.to_string())),
        }
    }

    fn receive(&mut self) -> SocketResult<Option<Frame>> {
        let socket = self.socket.as_mut().ok_or(SocketError::NotConnected)?;

        match socket.read() {
            Ok(Message::Text(text)) => Ok(Some(Frame::Text(text))),
            Ok(Message::Binary(data)) => Ok(Some(Frame::Binary(data))),
            Ok(Message::Ping(data)) => {
                // WebSocket-level liveness, distinct from the protocol's
                // JSON ping; answered here so sessions never see it.
                let _ = socket.send(Message::Pong(data));
                Ok(None)
            }
            Ok(Message::Pong(_)) => Ok(None),
            Ok(Message::Close(close_frame)) => {
                let info = match close_frame {
                    Some(cf) => CloseInfo {
                        code: Some(u16::from(cf.code)),
                        reason: cf.reason.into_owned(),
                        was_clean: true,
                    },
                    None => CloseInfo {
                        code: None,
                        reason: String::new(),
                        was_clean: true,
                    },
                };
                self.mark_closed();
                Err(SocketError::Closed(info))
            }
            Ok(Message::Frame(_)) => Ok(None),
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // No frame available within the read timeout
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed) => {
                self.mark_closed();
                Err(SocketError::Closed(CloseInfo {
                    code: None,
                    reason: String::new(),
                    was_clean: true,
                }))
            }
            Err(tungstenite::Error::AlreadyClosed) => {
                self.mark_closed();
                Err(SocketError::NotConnected)
            }
            Err(tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                self.mark_closed();
                Err(SocketError::Closed(CloseInfo::dropped(
                    "connection reset without closing handshake",
                )))
            }
            Err(tungstenite::Error::Io(e)) => {
                self.mark_closed();
                Err(SocketError::Closed(CloseInfo::dropped(e.to_string())))
            }
            Err(e) => Err(SocketError::ReceiveFailed(e.to_string())),
        }
    }
}
