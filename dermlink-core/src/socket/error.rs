//! Socket Errors
//!
//! Error types for the transport and codec layers.

use thiserror::Error;

use super::transport::CloseInfo;

/// Errors surfaced by transports and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// Could not establish a connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection has closed. Carries the close code and reason so the
    /// session's retry policy can classify the close.
    #[error("Connection closed: {0}")]
    Closed(CloseInfo),

    /// Operation requires an open connection.
    #[error("Transport not connected")]
    NotConnected,

    /// A frame could not be transmitted.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// A frame could not be read.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Errors decoding or encoding control messages.
///
/// Both decode variants are fatal protocol errors when they occur on a live
/// connection: a text frame that is not a well-formed control message means
/// the two ends have desynchronized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Text frame was not valid JSON.
    #[error("Malformed control message: {0}")]
    MalformedJson(String),

    /// Valid JSON, but not a message in the protocol vocabulary.
    #[error("Unrecognized control message: {0}")]
    UnrecognizedMessage(String),

    /// Outgoing message could not be serialized.
    #[error("Could not encode control message: {0}")]
    Encode(String),
}
