// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Receiver State Machine
//!
//! The expectation tracker. Binary frames carry no self-describing tag, so
//! the receiver must know, for every incoming frame, whether a control
//! message or which flavor of image payload is due next. The transition
//! logic is a pure function of (state, frame): sessions feed frames in and
//! apply the returned transition, which makes the whole table testable
//! without a live connection.
//!
//! Pairing-client role: three states, starting at `BarcodePayload` on every
//! (re)connection because the relay always leads with the pairing barcode.
//! Capture role: control frames only, with a send-side pending counter kept
//! by the session instead of a receive-side expectation.

use thiserror::Error;

use super::error::CodecError;
use super::message::{
    ControlMessage, Frame, ImagePayload, BARCODE_CONTENT_TYPE, CLOSE_UNEXPECTED_MESSAGE,
    CLOSE_UNEXPECTED_STATE,
};

/// What kind of frame the pairing client expects next.
///
/// The announced content type for a pending image lives inside the
/// `ImagePayload` variant, so a payload descriptor exists exactly when one
/// is expected. The barcode needs no descriptor: it is `image/png` by
/// protocol convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// A JSON control message.
    Control,
    /// The unannounced barcode image sent right after (re)connection.
    BarcodePayload,
    /// An image announced by a preceding `image` control message.
    ImagePayload { content_type: String },
}

/// A frame inconsistent with the current expectation.
///
/// Always fatal: the connection is actively closed with the carried code
/// and the stream is not recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (close code {code})")]
pub struct ProtocolViolation {
    /// Close code to send; a wire contract, see the message module.
    pub code: u16,
    /// Close reason string.
    pub reason: &'static str,
}

impl ProtocolViolation {
    /// A control message whose type is not valid in the current state,
    /// or a text frame that is not a control message at all.
    pub fn unexpected_message() -> Self {
        ProtocolViolation {
            code: CLOSE_UNEXPECTED_MESSAGE,
            reason: "Received unexpected message",
        }
    }

    /// A frame of the wrong kind for the current expectation.
    pub fn unexpected_state() -> Self {
        ProtocolViolation {
            code: CLOSE_UNEXPECTED_STATE,
            reason: "Socket in unexpected state",
        }
    }
}

/// Event produced by a pairing-client transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverEvent {
    /// A capture device paired; carries the shared verifier.
    PeerAttached { verifier: String },
    /// The paired capture device disconnected.
    PeerDetached,
    /// The pairing barcode arrived.
    BarcodeReceived(ImagePayload),
    /// An announced image arrived.
    ImageReceived(ImagePayload),
    /// Liveness reply.
    Pong,
}

/// Result of feeding one frame to the pairing-client state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State after the frame.
    pub next: Expectation,
    /// Event to surface, if the frame produced one.
    pub event: Option<ReceiverEvent>,
    /// Control message to send back (`ack` after an announced image).
    pub reply: Option<ControlMessage>,
}

impl Transition {
    fn to(next: Expectation) -> Self {
        Transition {
            next,
            event: None,
            reply: None,
        }
    }

    fn with_event(mut self, event: ReceiverEvent) -> Self {
        self.event = Some(event);
        self
    }

    fn with_reply(mut self, reply: ControlMessage) -> Self {
        self.reply = Some(reply);
        self
    }
}

/// Advances the pairing-client state machine by one frame.
pub fn client_step(state: Expectation, frame: Frame) -> Result<Transition, ProtocolViolation> {
    match (state, frame) {
        (Expectation::Control, Frame::Text(text)) => {
            let msg = decode_control(&text)?;
            match msg {
                ControlMessage::Peer { verifier } => Ok(Transition::to(Expectation::Control)
                    .with_event(ReceiverEvent::PeerAttached { verifier })),
                ControlMessage::Unpeer => Ok(
                    Transition::to(Expectation::Control).with_event(ReceiverEvent::PeerDetached)
                ),
                ControlMessage::Image { content_type } => {
                    Ok(Transition::to(Expectation::ImagePayload { content_type }))
                }
                ControlMessage::Pong => {
                    Ok(Transition::to(Expectation::Control).with_event(ReceiverEvent::Pong))
                }
                _ => Err(ProtocolViolation::unexpected_message()),
            }
        }
        (Expectation::Control, Frame::Binary(_)) => Err(ProtocolViolation::unexpected_state()),
        (Expectation::BarcodePayload, Frame::Binary(data)) => {
            Ok(Transition::to(Expectation::Control).with_event(ReceiverEvent::BarcodeReceived(
                ImagePayload {
                    content_type: BARCODE_CONTENT_TYPE.to_string(),
                    data,
                },
            )))
        }
        (Expectation::ImagePayload { content_type }, Frame::Binary(data)) => {
            Ok(Transition::to(Expectation::Control)
                .with_event(ReceiverEvent::ImageReceived(ImagePayload {
                    content_type,
                    data,
                }))
                .with_reply(ControlMessage::Ack))
        }
        // Control frame while an image payload is due: desynchronized.
        (Expectation::BarcodePayload | Expectation::ImagePayload { .. }, Frame::Text(_)) => {
            Err(ProtocolViolation::unexpected_state())
        }
    }
}

/// Event produced by a capture-role transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileReceiverEvent {
    /// Relay confirmed authentication; carries the shared verifier.
    Hello { verifier: String },
    /// Relay acknowledged a sent image.
    Ack,
    /// Liveness reply.
    Pong,
}

/// Advances the capture-role receiver by one frame.
///
/// The capture role never expects binary frames, so there is no state to
/// thread through: every valid frame is a control message.
pub fn mobile_step(frame: Frame) -> Result<MobileReceiverEvent, ProtocolViolation> {
    match frame {
        Frame::Text(text) => match decode_control(&text)? {
            ControlMessage::Hello { verifier } => Ok(MobileReceiverEvent::Hello { verifier }),
            ControlMessage::Ack => Ok(MobileReceiverEvent::Ack),
            ControlMessage::Pong => Ok(MobileReceiverEvent::Pong),
            _ => Err(ProtocolViolation::unexpected_message()),
        },
        Frame::Binary(_) => Err(ProtocolViolation::unexpected_state()),
    }
}

/// A text frame that does not decode as a control message leaves the stream
/// position unknowable; same treatment as an unknown message type.
fn decode_control(text: &str) -> Result<ControlMessage, ProtocolViolation> {
    ControlMessage::decode(text).map_err(|_: CodecError| ProtocolViolation::unexpected_message())
}
