// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Wire Protocol Messages
//!
//! The control vocabulary shared by the pairing client, the capture client
//! and the relay. Control messages travel as JSON text frames tagged by a
//! `type` field; image payloads travel as raw binary frames with no envelope,
//! announced out-of-band by a preceding `image` control message.

use serde::{Deserialize, Serialize};

use super::error::CodecError;

/// Close code for a control message that is not valid in the current state.
///
/// Wire contract with deployed relays; the numeric value must not change.
pub const CLOSE_UNEXPECTED_MESSAGE: u16 = 1002;

/// Close code for a frame of the wrong kind (binary while a control message
/// was expected, or the reverse). Same wire-contract caveat as above.
pub const CLOSE_UNEXPECTED_STATE: u16 = 1011;

/// The pairing barcode is always a PNG; it arrives unannounced as the first
/// binary frame of a connection, so its content type is fixed by convention.
pub const BARCODE_CONTENT_TYPE: &str = "image/png";

/// A raw frame as delivered by a transport.
///
/// Text frames always carry control messages. Binary frames carry image
/// bytes whose meaning depends entirely on the receiver's current
/// expectation, since the wire format has no per-frame type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// A received image together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// MIME type, either announced (`image` message) or implied (barcode).
    pub content_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

/// Control messages exchanged over the image relay.
///
/// Serialized as `{"type": "<variant>", ...fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Liveness probe, sent every ping interval by whichever side.
    Ping,
    /// Liveness reply; ignored on receipt.
    Pong,
    /// A capture device has paired with this session.
    Peer { verifier: String },
    /// The paired capture device disconnected.
    Unpeer,
    /// The next binary frame is an image of the given MIME type.
    Image { content_type: String },
    /// Pairing client requests disconnection of its peer.
    Kick,
    /// Receipt of an announced image is acknowledged.
    Ack,
    /// Capture device authenticates with its pairing token.
    Auth { token: String },
    /// Relay confirms authentication and reports the shared verifier.
    Hello { verifier: String },
}

impl ControlMessage {
    /// Encodes the message for transmission as a text frame.
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decodes a text frame.
    ///
    /// Distinguishes frames that are not JSON at all from well-formed JSON
    /// outside the protocol vocabulary; both are fatal on a live connection.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CodecError::MalformedJson(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| CodecError::UnrecognizedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_tagged_shape() {
        assert_eq!(ControlMessage::Ping.encode().unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(
            ControlMessage::Image {
                content_type: "image/jpeg".into()
            }
            .encode()
            .unwrap(),
            r#"{"type":"image","content_type":"image/jpeg"}"#
        );
        assert_eq!(
            ControlMessage::Auth {
                token: "T".into()
            }
            .encode()
            .unwrap(),
            r#"{"type":"auth","token":"T"}"#
        );
    }

    #[test]
    fn test_decode_known_messages() {
        assert_eq!(
            ControlMessage::decode(r#"{"type":"peer","verifier":"0042"}"#).unwrap(),
            ControlMessage::Peer {
                verifier: "0042".into()
            }
        );
        assert_eq!(
            ControlMessage::decode(r#"{"type":"unpeer"}"#).unwrap(),
            ControlMessage::Unpeer
        );
        assert_eq!(
            ControlMessage::decode(r#"{"type":"pong"}"#).unwrap(),
            ControlMessage::Pong
        );
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = ControlMessage::decode("not json").unwrap_err();
        assert!(matches!(err, CodecError::MalformedJson(_)));
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = ControlMessage::decode(r#"{"type":"launch_missiles"}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnrecognizedMessage(_)));
    }

    #[test]
    fn test_decode_missing_field() {
        // A peer message without its verifier is outside the vocabulary.
        let err = ControlMessage::decode(r#"{"type":"peer"}"#).unwrap_err();
        assert!(matches!(err, CodecError::UnrecognizedMessage(_)));
    }

    #[test]
    fn test_roundtrip() {
        let msgs = vec![
            ControlMessage::Ping,
            ControlMessage::Pong,
            ControlMessage::Peer {
                verifier: "1234".into(),
            },
            ControlMessage::Unpeer,
            ControlMessage::Image {
                content_type: "image/png".into(),
            },
            ControlMessage::Kick,
            ControlMessage::Ack,
            ControlMessage::Auth {
                token: "secret".into(),
            },
            ControlMessage::Hello {
                verifier: "1234".into(),
            },
        ];
        for msg in msgs {
            let encoded = msg.encode().unwrap();
            assert_eq!(ControlMessage::decode(&encoded).unwrap(), msg);
        }
    }
}
