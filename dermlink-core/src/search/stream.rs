//! Search Result Stream
//!
//! Read-only session delivering ranked search results as they are found.
//! One stream per search; there is no reconnect, since a search that loses
//! its stream is simply re-run. The stream tracks whether `search_complete`
//! arrived so an early close is distinguishable from a finished search.

use serde_json::{Map, Value};

use super::super::socket::{
    CloseInfo, ConnectionState, Frame, ProtocolViolation, SocketError, Transport, TransportConfig,
    NOT_CONFIGURED_REASON,
};
use super::message::{SearchMessage, SearchRequest};

/// Configuration for a search result stream.
#[derive(Debug, Clone)]
pub struct SearchStreamConfig {
    /// Stream URL handed back by the HTTP search request. `None` puts the
    /// stream in the permanently closed "not configured" state.
    pub url: Option<String>,
    /// Key identifying the running search.
    pub search_key: String,
    /// Transport tuning (timeouts); the URL field inside is ignored.
    pub transport: TransportConfig,
}

impl SearchStreamConfig {
    /// Creates a config from the `socket_url`/`search_key` pair returned by
    /// the search endpoint.
    pub fn new(url: &str, search_key: &str) -> Self {
        SearchStreamConfig {
            url: Some(url.to_string()),
            search_key: search_key.to_string(),
            transport: TransportConfig::default(),
        }
    }
}

/// Events surfaced by a search result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    /// The stream is attached to the search.
    Connected,
    /// One ranked result, with its backend-defined attributes.
    Result { attrs: Map<String, Value> },
    /// Progress counters; `objs_total` of zero means progress is unknown.
    Statistics { objs_processed: u64, objs_total: u64 },
    /// The search has processed every index object.
    Complete,
    /// The backend reported a failure. The stream stays open; the search
    /// may still produce results.
    SearchError { message: String },
    /// The inbound stream violated the protocol; the connection was closed
    /// with the given code.
    ProtocolError { code: u16, reason: String },
    /// The stream closed. `complete` tells whether `search_complete` was
    /// seen first; a close without it means the search terminated
    /// unexpectedly.
    Closed {
        reason: String,
        was_clean: bool,
        complete: bool,
    },
}

/// Search result stream over any transport.
pub struct SearchStream<T: Transport> {
    transport: T,
    config: SearchStreamConfig,
    complete: bool,
    closed: Option<CloseInfo>,
}

impl<T: Transport> SearchStream<T> {
    /// Creates a stream; call `connect` to attach to the search.
    pub fn new(transport: T, config: SearchStreamConfig) -> Self {
        SearchStream {
            transport,
            config,
            complete: false,
            closed: None,
        }
    }

    /// Opens the connection and attaches to the search by key.
    pub fn connect(&mut self) -> Vec<SearchEvent> {
        let mut events = Vec::new();

        let url = match &self.config.url {
            Some(url) => url.clone(),
            None => {
                let info = CloseInfo {
                    code: None,
                    reason: NOT_CONFIGURED_REASON.to_string(),
                    was_clean: true,
                };
                self.terminate(info, &mut events);
                return events;
            }
        };

        let mut config = self.config.transport.clone();
        config.url = url;

        if let Err(e) = self.transport.connect(&config) {
            self.terminate(CloseInfo::dropped(e.to_string()), &mut events);
            return events;
        }

        let start = SearchRequest::Start {
            search_key: self.config.search_key.clone(),
        };
        let encoded = match start.encode() {
            Ok(text) => text,
            Err(e) => {
                self.terminate(CloseInfo::dropped(e.to_string()), &mut events);
                return events;
            }
        };
        if let Err(e) = self.transport.send(Frame::Text(encoded)) {
            self.terminate(CloseInfo::dropped(e.to_string()), &mut events);
            return events;
        }

        events.push(SearchEvent::Connected);
        events
    }

    /// Drains all frames the transport has ready. Returns nothing once the
    /// stream is closed.
    pub fn poll(&mut self) -> Vec<SearchEvent> {
        let mut events = Vec::new();

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

    /// Detaches from the search.
    pub fn close(&mut self) {
        if self.closed.is_none() {
            let _ = self.transport.disconnect();
            self.closed = Some(CloseInfo {
                code: None,
                reason: String::new(),
                was_clean: true,
            });
        }
    }

    /// True once `search_complete` has been received.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True while the stream is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.state() == ConnectionState::Connected
    }

    /// The terminal close, once the stream has closed.
    pub fn closed(&self) -> Option<&CloseInfo> {
        self.closed.as_ref()
    }

    /// Returns a reference to the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn handle_frame(&mut self, frame: Frame, events: &mut Vec<SearchEvent>) {
        let text = match frame {
            Frame::Text(text) => text,
            // This stream is text-only; a binary frame means the two ends
            // have desynchronized.
            Frame::Binary(_) => {
                self.fail_protocol(ProtocolViolation::unexpected_state(), events);
                return;
            }
        };

        match SearchMessage::decode(&text) {
            Ok(SearchMessage::Result { attrs }) => events.push(SearchEvent::Result { attrs }),
            Ok(SearchMessage::Statistics {
                objs_processed,
                objs_total,
            }) => events.push(SearchEvent::Statistics {
                objs_processed,
                objs_total,
            }),
            Ok(SearchMessage::SearchComplete) => {
                self.complete = true;
                events.push(SearchEvent::Complete);
            }
            Ok(SearchMessage::Error { message }) => {
                events.push(SearchEvent::SearchError { message })
            }
            Err(_) => self.fail_protocol(ProtocolViolation::unexpected_message(), events),
        }
    }

    fn fail_protocol(&mut self, violation: ProtocolViolation, events: &mut Vec<SearchEvent>) {
        let _ = self.transport.close_with(violation.code, violation.reason);
        events.push(SearchEvent::ProtocolError {
            code: violation.code,
            reason: violation.reason.to_string(),
        });
        self.terminate(CloseInfo::clean(violation.code, violation.reason), events);
    }

    fn terminate(&mut self, info: CloseInfo, events: &mut Vec<SearchEvent>) {
        let _ = self.transport.disconnect();
        events.push(SearchEvent::Closed {
            reason: info.display_reason().to_string(),
            was_clean: info.was_clean,
            complete: self.complete,
        });
        self.closed = Some(info);
    }
}
