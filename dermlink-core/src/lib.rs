//! DermLink Core Library
//!
//! Socket layer for a clinical image-search application: a browser
//! "pairing" client and a mobile "capture" client exchange images through a
//! relay over a shared wire protocol of JSON control frames interleaved
//! with raw binary payloads, plus a companion stream delivering ranked
//! search results.

pub mod search;
pub mod socket;

pub use search::{SearchEvent, SearchMessage, SearchRequest, SearchStream, SearchStreamConfig};
pub use socket::{
    ClientEvent, ClientSession, ClientSessionConfig, CloseInfo, CodecError, ConnectionState,
    ControlMessage, Expectation, Frame, ImagePayload, MobileEvent, MobileSession,
    MobileSessionConfig, MockTransport, ProtocolViolation, SocketError, Transport,
    TransportConfig, WebSocketTransport,
};
