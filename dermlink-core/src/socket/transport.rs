//! Transport Trait
//!
//! Platform-agnostic abstraction for the persistent frame connection.

use std::fmt;

use super::error::SocketError;
use super::message::Frame;

/// Result type for transport operations.
pub type SocketResult<T> = Result<T, SocketError>;

/// Close reason reported by sessions created without a relay URL.
///
/// Running without a relay is a supported degraded deployment, not an
/// error: the session starts permanently closed with this reason and never
/// attempts to connect.
pub const NOT_CONFIGURED_REASON: &str = "not configured";

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected to any relay.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready.
    Connected,
}

/// How a connection ended.
///
/// `was_clean` is true when the close completed through a close handshake
/// (including closes this side initiated); an abrupt network failure is
/// unclean. Sessions key their retry policy off this flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// Close code, when one was carried on the wire.
    pub code: Option<u16>,
    /// Close reason; may be empty.
    pub reason: String,
    /// Whether the close handshake completed.
    pub was_clean: bool,
}

impl CloseInfo {
    /// An unclean close with no wire-level close frame.
    pub fn dropped(reason: impl Into<String>) -> Self {
        CloseInfo {
            code: None,
            reason: reason.into(),
            was_clean: false,
        }
    }

    /// A clean close carrying a code and reason.
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        CloseInfo {
            code: Some(code),
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// The reason to display, substituting a generic one when the close
    /// frame carried none.
    pub fn display_reason(&self) -> &str {
        if self.reason.is_empty() {
            "Connection closed"
        } else {
            &self.reason
        }
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.display_reason(), code),
            None => write!(f, "{}", self.display_reason()),
        }
    }
}

/// Configuration for transport connections.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Relay URL (`ws://` or `wss://`).
    pub url: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds. This bounds how long a single
    /// `receive` call may block, so it is effectively the session's poll
    /// granularity.
    pub io_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            url: String::new(),
            connect_timeout_ms: 10_000,
            io_timeout_ms: 250,
        }
    }
}

/// Transport trait for the image relay connection.
///
/// Abstracts the underlying socket so sessions can be driven by a scripted
/// mock in tests. The interface is synchronous and polling: `receive`
/// returns `Ok(None)` when no frame is ready yet and
/// `Err(SocketError::Closed(_))` once the connection has ended.
pub trait Transport: Send {
    /// Establishes a connection to the configured URL.
    fn connect(&mut self, config: &TransportConfig) -> SocketResult<()>;

    /// Closes the connection without a specific close code.
    ///
    /// Safe to call even if not connected.
    fn disconnect(&mut self) -> SocketResult<()>;

    /// Actively closes the connection with a close code and reason.
    ///
    /// Used for protocol violations, where the code is part of the wire
    /// contract with the relay.
    fn close_with(&mut self, code: u16, reason: &str) -> SocketResult<()>;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Sends a text or binary frame.
    ///
    /// Returns `Err(SocketError::NotConnected)` if called while not
    /// connected; frames are never silently dropped.
    fn send(&mut self, frame: Frame) -> SocketResult<()>;

    /// Receives the next frame, if one is ready.
    ///
    /// Returns `Ok(None)` on timeout without error, and
    /// `Err(SocketError::Closed(info))` once the connection has closed.
    fn receive(&mut self) -> SocketResult<Option<Frame>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.io_timeout_ms, 250);
    }

    #[test]
    fn test_close_info_display_reason_fallback() {
        let info = CloseInfo::dropped("");
        assert_eq!(info.display_reason(), "Connection closed");

        let info = CloseInfo::clean(1000, "Session closed");
        assert_eq!(info.display_reason(), "Session closed");
    }

    #[test]
    fn test_close_info_display() {
        let info = CloseInfo::clean(1002, "Received unexpected message");
        assert_eq!(info.to_string(), "Received unexpected message (code 1002)");

        let info = CloseInfo::dropped("connection reset");
        assert_eq!(info.to_string(), "connection reset");
    }
}
