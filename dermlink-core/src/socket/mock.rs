//! Mock Transport
//!
//! Scripted transport double for driving sessions in tests without a live
//! connection.

use std::collections::VecDeque;

use super::error::SocketError;
use super::message::{ControlMessage, Frame};
use super::transport::{CloseInfo, ConnectionState, SocketResult, Transport, TransportConfig};

enum ScriptItem {
    Frame(Frame),
    Close(CloseInfo),
}

/// Scripted transport: frames and closes queued by the test are delivered
/// in order; everything the session sends is recorded.
pub struct MockTransport {
    state: ConnectionState,
    script: VecDeque<ScriptItem>,
    sent: Vec<Frame>,
    closes: Vec<(u16, String)>,
    connect_count: u32,
    connect_error: Option<SocketError>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a new, disconnected mock.
    pub fn new() -> Self {
        MockTransport {
            state: ConnectionState::Disconnected,
            script: VecDeque::new(),
            sent: Vec::new(),
            closes: Vec::new(),
            connect_count: 0,
            connect_error: None,
        }
    }

    /// Queues a frame for delivery through `receive`.
    pub fn queue_frame(&mut self, frame: Frame) {
        self.script.push_back(ScriptItem::Frame(frame));
    }

    /// Queues a control message, encoded as a text frame.
    pub fn queue_control(&mut self, msg: ControlMessage) {
        let text = msg.encode().expect("control messages always encode");
        self.queue_frame(Frame::Text(text));
    }

    /// Queues a connection close; delivered after all earlier frames.
    pub fn queue_close(&mut self, info: CloseInfo) {
        self.script.push_back(ScriptItem::Close(info));
    }

    /// Makes the next `connect` call fail with the given error.
    pub fn inject_connect_error(&mut self, error: SocketError) {
        self.connect_error = Some(error);
    }

    /// Frames sent by the session, in order.
    pub fn sent_frames(&self) -> &[Frame] {
        &self.sent
    }

    /// Sent text frames decoded as control messages, in order.
    pub fn sent_controls(&self) -> Vec<ControlMessage> {
        self.sent
            .iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => ControlMessage::decode(text).ok(),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    /// Clears the record of sent frames.
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Number of successful `connect` calls so far.
    pub fn connect_count(&self) -> u32 {
        self.connect_count
    }

    /// Calls to `close_with`, as (code, reason) pairs.
    pub fn close_calls(&self) -> &[(u16, String)] {
        &self.closes
    }

    /// Forces the connection state, bypassing the lifecycle.
    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _config: &TransportConfig) -> SocketResult<()> {
        if let Some(error) = self.connect_error.take() {
            self.state = ConnectionState::Disconnected;
            return Err(error);
        }
        self.state = ConnectionState::Connected;
        self.connect_count += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> SocketResult<()> {
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn close_with(&mut self, code: u16, reason: &str) -> SocketResult<()> {
        self.closes.push((code, reason.to_string()));
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    fn send(&mut self, frame: Frame) -> SocketResult<()> {
        if self.state != ConnectionState::Connected {
            return Err(SocketError::NotConnected);
        }
        self.sent.push(frame);
        Ok(())
    }

    fn receive(&mut self) -> SocketResult<Option<Frame>> {
        if self.state != ConnectionState::Connected {
            return Err(SocketError::NotConnected);
        }
        match self.script.pop_front() {
            Some(ScriptItem::Frame(frame)) => Ok(Some(frame)),
            Some(ScriptItem::Close(info)) => {
                self.state = ConnectionState::Disconnected;
                Err(SocketError::Closed(info))
            }
            None => Ok(None),
        }
    }
}
