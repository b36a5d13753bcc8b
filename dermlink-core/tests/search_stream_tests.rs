// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for search::stream

use dermlink_core::search::*;
use dermlink_core::socket::*;

fn test_config() -> SearchStreamConfig {
    SearchStreamConfig::new("ws://search.test/stream", "key-1")
}

fn attached_stream(transport: MockTransport) -> SearchStream<MockTransport> {
    let mut stream = SearchStream::new(transport, test_config());
    let events = stream.connect();
    assert_eq!(events, vec![SearchEvent::Connected]);
    stream
}

fn result_frame(score: &str) -> Frame {
    Frame::Text(format!(
        r#"{{"type":"result","_filter.distance_score":{{"data":"{}"}}}}"#,
        score
    ))
}

#[test]
fn test_connect_attaches_by_key() {
    let stream = attached_stream(MockTransport::new());
    assert_eq!(
        stream.transport().sent_frames(),
        &[Frame::Text(r#"{"type":"start","search_key":"key-1"}"#.into())]
    );
}

#[test]
fn test_not_configured_never_connects() {
    let config = SearchStreamConfig {
        url: None,
        search_key: "key-1".into(),
        transport: TransportConfig::default(),
    };
    let mut stream = SearchStream::new(MockTransport::new(), config);
    let events = stream.connect();
    assert_eq!(
        events,
        vec![SearchEvent::Closed {
            reason: "not configured".into(),
            was_clean: true,
            complete: false,
        }]
    );
    assert_eq!(stream.transport().connect_count(), 0);
}

#[test]
fn test_results_and_statistics_flow() {
    let mut transport = MockTransport::new();
    transport.queue_frame(result_frame("0.12"));
    transport.queue_frame(Frame::Text(
        r#"{"type":"statistics","objs_processed":50,"objs_total":200}"#.into(),
    ));
    transport.queue_frame(result_frame("0.48"));
    transport.queue_frame(Frame::Text(r#"{"type":"search_complete"}"#.into()));

    let mut stream = attached_stream(transport);
    let events = stream.poll();

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], SearchEvent::Result { .. }));
    assert_eq!(
        events[1],
        SearchEvent::Statistics {
            objs_processed: 50,
            objs_total: 200
        }
    );
    assert!(matches!(events[2], SearchEvent::Result { .. }));
    assert_eq!(events[3], SearchEvent::Complete);
    assert!(stream.is_complete());
}

#[test]
fn test_backend_error_does_not_close_the_stream() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Text(
        r#"{"type":"error","message":"scope expired"}"#.into(),
    ));
    transport.queue_frame(result_frame("0.77"));

    let mut stream = attached_stream(transport);
    let events = stream.poll();

    assert_eq!(
        events[0],
        SearchEvent::SearchError {
            message: "scope expired".into()
        }
    );
    // The stream survived and kept delivering results
    assert!(matches!(events[1], SearchEvent::Result { .. }));
    assert!(stream.closed().is_none());
}

#[test]
fn test_close_before_complete_is_distinguishable() {
    let mut transport = MockTransport::new();
    transport.queue_frame(result_frame("0.31"));
    transport.queue_close(CloseInfo {
        code: None,
        reason: String::new(),
        was_clean: true,
    });

    let mut stream = attached_stream(transport);
    let events = stream.poll();

    assert_eq!(
        events[1],
        SearchEvent::Closed {
            reason: "Connection closed".into(),
            was_clean: true,
            complete: false,
        }
    );
}

#[test]
fn test_close_after_complete() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Text(r#"{"type":"search_complete"}"#.into()));
    transport.queue_close(CloseInfo {
        code: None,
        reason: String::new(),
        was_clean: true,
    });

    let mut stream = attached_stream(transport);
    let events = stream.poll();
    assert_eq!(
        events[1],
        SearchEvent::Closed {
            reason: "Connection closed".into(),
            was_clean: true,
            complete: true,
        }
    );
}

#[test]
fn test_unclean_close_reports_reason() {
    let mut transport = MockTransport::new();
    transport.queue_close(CloseInfo::dropped("connection reset"));

    let mut stream = attached_stream(transport);
    let events = stream.poll();
    assert_eq!(
        events,
        vec![SearchEvent::Closed {
            reason: "connection reset".into(),
            was_clean: false,
            complete: false,
        }]
    );
}

#[test]
fn test_binary_frame_closes_1011() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![0u8; 4]));

    let mut stream = attached_stream(transport);
    let events = stream.poll();
    assert!(events.contains(&SearchEvent::ProtocolError {
        code: CLOSE_UNEXPECTED_STATE,
        reason: "Socket in unexpected state".into(),
    }));
    assert_eq!(
        stream.transport().close_calls(),
        &[(CLOSE_UNEXPECTED_STATE, "Socket in unexpected state".into())]
    );
}

#[test]
fn test_unknown_message_closes_1002() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Text(r#"{"type":"shutdown"}"#.into()));

    let mut stream = attached_stream(transport);
    let events = stream.poll();
    assert!(events.iter().any(|e| matches!(
        e,
        SearchEvent::ProtocolError {
            code: CLOSE_UNEXPECTED_MESSAGE,
            ..
        }
    )));
}

#[test]
fn test_explicit_close_is_clean() {
    let mut stream = attached_stream(MockTransport::new());
    stream.close();
    assert!(stream.closed().is_some());
    assert!(stream.poll().is_empty());
}
