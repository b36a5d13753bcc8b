//! Image/Control Socket Layer
//!
//! A persistent bidirectional connection carrying an interleaved sequence
//! of JSON control messages and raw binary image payloads, multiplexed over
//! one channel. Binary frames carry no type tag, so a receiver-side
//! expectation state machine tracks what kind of frame is due next.
//!
//! # Architecture
//!
//! - **Transport trait**: platform-agnostic frame I/O with lifecycle states
//! - **Message types**: the tagged-JSON control vocabulary and close codes
//! - **Receiver**: pure transition functions over an explicit expectation
//! - **Client session**: the browser pairing role (barcode, peer, images)
//! - **Mobile session**: the capture role (auth handshake, image upload)
//!
//! # Example
//!
//! ```ignore
//! use dermlink_core::socket::{ClientSession, ClientSessionConfig, WebSocketTransport};
//!
//! let transport = WebSocketTransport::new();
//! let config = ClientSessionConfig::for_url("wss://relay.example.com/ws/client");
//! let mut session = ClientSession::new(transport, config);
//!
//! session.connect();
//! loop {
//!     for event in session.poll() {
//!         // barcode, peer, images...
//!     }
//! }
//! ```

mod client;
mod error;
mod message;
mod mock;
mod mobile;
mod receiver;
mod transport;
mod websocket;

// Error types
pub use error::{CodecError, SocketError};

// Wire protocol
pub use message::{
    ControlMessage, Frame, ImagePayload, BARCODE_CONTENT_TYPE, CLOSE_UNEXPECTED_MESSAGE,
    CLOSE_UNEXPECTED_STATE,
};

// Transport abstraction
pub use transport::{
    CloseInfo, ConnectionState, SocketResult, Transport, TransportConfig, NOT_CONFIGURED_REASON,
};

// Mock transport for testing
pub use mock::MockTransport;

// WebSocket transport for production
pub use websocket::WebSocketTransport;

// Receiver state machine
pub use receiver::{
    client_step, mobile_step, Expectation, MobileReceiverEvent, ProtocolViolation, ReceiverEvent,
    Transition,
};

// Sessions
pub use client::{ClientEvent, ClientSession, ClientSessionConfig};
pub use mobile::{MobileEvent, MobileSession, MobileSessionConfig};
