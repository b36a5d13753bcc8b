// SPDX-FileCopyrightText: 2026 DermLink Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for socket::client

use std::time::Duration;

use dermlink_core::socket::*;

fn test_config() -> ClientSessionConfig {
    ClientSessionConfig {
        url: Some("ws://relay.test/ws/client".into()),
        // Long ping interval so pings do not interleave with scenarios
        ping_interval: Duration::from_secs(3600),
        reconnect_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn connected_session(transport: MockTransport) -> ClientSession<MockTransport> {
    let mut session = ClientSession::new(transport, test_config());
    let events = session.connect();
    assert_eq!(events, vec![ClientEvent::Connected]);
    session
}

#[test]
fn test_not_configured_never_connects() {
    let config = ClientSessionConfig::default();
    let mut session = ClientSession::new(MockTransport::new(), config);

    let events = session.connect();
    assert_eq!(
        events,
        vec![ClientEvent::Closed {
            reason: "not configured".into(),
            was_clean: true,
        }]
    );
    assert_eq!(session.closed_reason(), Some("not configured"));
    assert_eq!(session.transport().connect_count(), 0);

    // Permanently closed: polling does nothing and sends nothing
    assert!(session.poll().is_empty());
    assert!(session.transport().sent_frames().is_empty());
}

#[test]
fn test_barcode_then_announced_image_scenario() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(b"\x89PNG\r\n\x1a\n....".to_vec()));
    transport.queue_control(ControlMessage::Image {
        content_type: "image/jpeg".into(),
    });
    transport.queue_frame(Frame::Binary(vec![0xff, 0xd8, 0xff]));

    let mut session = connected_session(transport);
    assert_eq!(session.expectation(), &Expectation::BarcodePayload);

    let events = session.poll();
    assert_eq!(
        events,
        vec![
            ClientEvent::BarcodeReceived(ImagePayload {
                content_type: "image/png".into(),
                data: b"\x89PNG\r\n\x1a\n....".to_vec(),
            }),
            ClientEvent::ImageReceived(ImagePayload {
                content_type: "image/jpeg".into(),
                data: vec![0xff, 0xd8, 0xff],
            }),
        ]
    );

    // The announced image was acknowledged and the receiver is back to
    // expecting control messages
    assert_eq!(session.transport().sent_controls(), vec![ControlMessage::Ack]);
    assert_eq!(session.expectation(), &Expectation::Control);
}

#[test]
fn test_peer_and_unpeer_track_verifier() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_control(ControlMessage::Peer {
        verifier: "0042".into(),
    });

    let mut session = connected_session(transport);
    let events = session.poll();
    assert!(events.contains(&ClientEvent::PeerAttached {
        verifier: "0042".into()
    }));
    assert_eq!(session.verifier(), Some("0042"));

    session.transport_mut().queue_control(ControlMessage::Unpeer);
    let events = session.poll();
    assert!(events.contains(&ClientEvent::PeerDetached));
    assert_eq!(session.verifier(), None);
}

#[test]
fn test_unpeer_without_peer_is_noop() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_control(ControlMessage::Unpeer);

    let mut session = connected_session(transport);
    let events = session.poll();

    // No verifier was set, so nothing is reported and nothing breaks
    assert!(!events.contains(&ClientEvent::PeerDetached));
    assert!(session.closed().is_none());
    assert_eq!(session.verifier(), None);
}

#[test]
fn test_pong_is_surfaced_and_ignored() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_control(ControlMessage::Pong);

    let mut session = connected_session(transport);
    let events = session.poll();
    assert!(events.contains(&ClientEvent::Pong));
    assert_eq!(session.expectation(), &Expectation::Control);
}

#[test]
fn test_binary_while_expecting_control_closes_1011() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_frame(Frame::Binary(vec![2]));

    let mut session = connected_session(transport);
    let events = session.poll();

    assert!(events.contains(&ClientEvent::ProtocolError {
        code: CLOSE_UNEXPECTED_STATE,
        reason: "Socket in unexpected state".into(),
    }));
    assert_eq!(
        session.transport().close_calls(),
        &[(CLOSE_UNEXPECTED_STATE, "Socket in unexpected state".into())]
    );

    // Desynchronization is terminal: no reconnect, no further events
    assert!(session.closed().is_some());
    assert!(session.poll().is_empty());
    assert_eq!(session.transport().connect_count(), 1);
}

#[test]
fn test_unexpected_control_type_closes_1002() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_control(ControlMessage::Kick);

    let mut session = connected_session(transport);
    let events = session.poll();

    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::ProtocolError {
            code: CLOSE_UNEXPECTED_MESSAGE,
            ..
        }
    )));
    assert!(session.closed().is_some());
}

#[test]
fn test_malformed_json_closes_1002() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_frame(Frame::Text("{not json".into()));

    let mut session = connected_session(transport);
    let events = session.poll();
    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::ProtocolError {
            code: CLOSE_UNEXPECTED_MESSAGE,
            ..
        }
    )));
}

#[test]
fn test_unclean_close_schedules_reconnect_and_resets_state() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(b"barcode-1".to_vec()));
    transport.queue_control(ControlMessage::Peer {
        verifier: "0042".into(),
    });
    transport.queue_close(CloseInfo::dropped("connection reset"));
    // Delivered on the next connection: must be read as a fresh barcode
    transport.queue_frame(Frame::Binary(b"barcode-2".to_vec()));

    let mut session = connected_session(transport);

    let events = session.poll();
    assert!(events.contains(&ClientEvent::PeerAttached {
        verifier: "0042".into()
    }));
    assert!(events.contains(&ClientEvent::Reconnecting));

    // Reconnect delay is zero: the next poll reopens
    let events = session.poll();
    assert_eq!(events[0], ClientEvent::Connected);
    assert!(events.contains(&ClientEvent::BarcodeReceived(ImagePayload {
        content_type: "image/png".into(),
        data: b"barcode-2".to_vec(),
    })));

    // Fresh connection, fresh state
    assert_eq!(session.transport().connect_count(), 2);
    assert_eq!(session.verifier(), None);
    assert!(session.closed().is_none());
}

#[test]
fn test_clean_close_is_terminal() {
    let mut transport = MockTransport::new();
    transport.queue_frame(Frame::Binary(vec![1]));
    transport.queue_close(CloseInfo::clean(1000, "Connection terminated by client"));

    let mut session = connected_session(transport);
    let events = session.poll();

    assert!(events.contains(&ClientEvent::Closed {
        reason: "Connection terminated by client".into(),
        was_clean: true,
    }));
    assert_eq!(
        session.closed_reason(),
        Some("Connection terminated by client")
    );
    assert_eq!(session.transport().connect_count(), 1);
}

#[test]
fn test_close_without_reason_reports_generic_reason() {
    let mut transport = MockTransport::new();
    transport.queue_close(CloseInfo {
        code: None,
        reason: String::new(),
        was_clean: true,
    });

    let mut session = connected_session(transport);
    let events = session.poll();
    assert!(events.contains(&ClientEvent::Closed {
        reason: "Connection closed".into(),
        was_clean: true,
    }));
}

#[test]
fn test_kick_sends_kick_message() {
    let mut session = connected_session(MockTransport::new());
    session.kick().unwrap();
    assert_eq!(
        session.transport().sent_controls(),
        vec![ControlMessage::Kick]
    );
}

#[test]
fn test_kick_while_closed_fails_loudly() {
    let mut transport = MockTransport::new();
    transport.queue_close(CloseInfo::clean(1000, "done"));

    let mut session = connected_session(transport);
    session.poll();

    assert!(matches!(session.kick(), Err(SocketError::NotConnected)));
}

#[test]
fn test_ping_sent_while_connected() {
    let config = ClientSessionConfig {
        ping_interval: Duration::ZERO,
        ..test_config()
    };
    let mut session = ClientSession::new(MockTransport::new(), config);
    session.connect();

    session.poll();
    session.poll();
    let pings = session
        .transport()
        .sent_controls()
        .iter()
        .filter(|m| **m == ControlMessage::Ping)
        .count();
    assert_eq!(pings, 2);
}

#[test]
fn test_no_ping_after_terminal_close() {
    let config = ClientSessionConfig {
        ping_interval: Duration::ZERO,
        ..test_config()
    };
    let mut transport = MockTransport::new();
    transport.queue_close(CloseInfo::clean(1000, "done"));

    let mut session = ClientSession::new(transport, config);
    session.connect();
    session.poll();
    assert!(session.closed().is_some());

    session.transport_mut().clear_sent();
    session.poll();
    session.poll();
    session.poll();
    assert!(session.transport().sent_frames().is_empty());
}

#[test]
fn test_connect_failure_is_retried() {
    let mut transport = MockTransport::new();
    transport.inject_connect_error(SocketError::ConnectionFailed("refused".into()));

    let mut session = ClientSession::new(transport, test_config());
    let events = session.connect();
    assert_eq!(events, vec![ClientEvent::Reconnecting]);

    // Next poll retries and succeeds
    let events = session.poll();
    assert_eq!(events, vec![ClientEvent::Connected]);
    assert_eq!(session.transport().connect_count(), 1);
}
