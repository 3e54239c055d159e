use std::time::Duration;

use serde_json::json;

use crate::transport::message::{Accepted, Command, Inbound, ReplyError, decode_frame};
use crate::transport::websocket::{CLIENT_NAME, ReconnectPolicy};

fn decode_all(text: &str) -> Vec<Inbound> {
    decode_frame(text)
        .into_iter()
        .map(|r| r.unwrap_or_else(|e| panic!("failed to decode '{text}': {e}")))
        .collect()
}

fn decode_one(text: &str) -> Inbound {
    let mut frames = decode_all(text);
    assert_eq!(frames.len(), 1, "expected a single reply in {text}");
    frames.remove(0)
}

#[test]
fn test_connect_command_encoding() {
    let encoded = Command::connect(CLIENT_NAME).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(value, json!({"id": 1, "connect": {"name": "subswarm"}}));
}

#[test]
fn test_subscribe_and_unsubscribe_encoding() {
    let value: serde_json::Value =
        serde_json::from_str(&Command::subscribe(2, "#42").to_json().unwrap()).unwrap();
    assert_eq!(value, json!({"id": 2, "subscribe": {"channel": "#42"}}));

    let value: serde_json::Value =
        serde_json::from_str(&Command::unsubscribe(7, "#42").to_json().unwrap()).unwrap();
    assert_eq!(value, json!({"id": 7, "unsubscribe": {"channel": "#42"}}));
}

#[test]
fn test_decode_ping() {
    assert_eq!(decode_one("{}"), Inbound::Ping);
    assert_eq!(decode_all(""), vec![Inbound::Ping]);
    assert_eq!(decode_all("\n\n"), vec![Inbound::Ping]);
}

#[test]
fn test_decode_connect_reply() {
    let reply = json!({"id": 1, "connect": {"client": "c-1", "version": "5.0.0"}}).to_string();
    assert_eq!(
        decode_one(&reply),
        Inbound::ConnectReply(Ok(Accepted {
            client_id: Some("c-1".into()),
            server_channels: Vec::new(),
        }))
    );

    let bare = json!({"id": 1, "connect": {}}).to_string();
    assert_eq!(decode_one(&bare), Inbound::ConnectReply(Ok(Accepted::default())));

    let rejected = json!({"id": 1, "error": {"code": 101, "message": "unauthorized"}}).to_string();
    assert_eq!(
        decode_one(&rejected),
        Inbound::ConnectReply(Err(ReplyError {
            code: 101,
            message: "unauthorized".into()
        }))
    );
}

#[test]
fn test_decode_connect_reply_with_server_subscriptions() {
    let reply = json!({
        "id": 1,
        "connect": {
            "client": "c-1",
            "subs": {"news": {"recoverable": false}, "alerts": {}}
        }
    })
    .to_string();
    assert_eq!(
        decode_one(&reply),
        Inbound::ConnectReply(Ok(Accepted {
            client_id: Some("c-1".into()),
            server_channels: vec!["alerts".into(), "news".into()],
        }))
    );
}

#[test]
fn test_decode_subscribe_reply() {
    let ok = json!({"id": 2, "subscribe": {}}).to_string();
    assert_eq!(decode_one(&ok), Inbound::CommandReply { id: 2, error: None });

    let failed = json!({"id": 3, "error": {"code": 103, "message": "permission denied"}}).to_string();
    assert_eq!(
        decode_one(&failed),
        Inbound::CommandReply {
            id: 3,
            error: Some(ReplyError {
                code: 103,
                message: "permission denied".into()
            })
        }
    );
}

#[test]
fn test_decode_publication_push() {
    let object = json!({"push": {"channel": "#42", "pub": {"data": {"text": "hi"}}}}).to_string();
    assert_eq!(
        decode_one(&object),
        Inbound::Publication {
            channel: "#42".into(),
            data: r#"{"text":"hi"}"#.into()
        }
    );

    // string payloads are forwarded as they are
    let string = json!({"push": {"channel": "#42", "pub": {"data": "plain"}}}).to_string();
    assert_eq!(
        decode_one(&string),
        Inbound::Publication {
            channel: "#42".into(),
            data: "plain".into()
        }
    );
}

#[test]
fn test_decode_subscription_pushes() {
    let subscribe = json!({"push": {"channel": "news", "subscribe": {}}}).to_string();
    assert_eq!(
        decode_one(&subscribe),
        Inbound::ServerSubscribed {
            channel: "news".into()
        }
    );

    let unsubscribe =
        json!({"push": {"channel": "#42", "unsubscribe": {"code": 2000, "reason": "server unsubscribe"}}})
            .to_string();
    assert_eq!(
        decode_one(&unsubscribe),
        Inbound::Unsubscribed {
            channel: "#42".into(),
            reason: "server unsubscribe".into()
        }
    );
}

#[test]
fn test_decode_disconnect_push() {
    let reconnect = json!({"push": {"disconnect": {"code": 3001, "reason": "shutdown"}}}).to_string();
    assert_eq!(
        decode_one(&reconnect),
        Inbound::Disconnect {
            reason: "shutdown".into(),
            reconnect: true
        }
    );

    let terminal =
        json!({"push": {"disconnect": {"code": 3501, "reason": "bad request", "reconnect": false}}})
            .to_string();
    assert_eq!(
        decode_one(&terminal),
        Inbound::Disconnect {
            reason: "bad request".into(),
            reconnect: false
        }
    );
}

#[test]
fn test_decode_multi_reply_frame() {
    let frame = format!(
        "{}\n{}\n{}",
        json!({"id": 2, "subscribe": {}}),
        json!({"push": {"channel": "#42", "pub": {"data": "x"}}}),
        json!({"push": {"channel": "#42", "join": {"info": {}}}}),
    );
    assert_eq!(
        decode_all(&frame),
        vec![
            Inbound::CommandReply { id: 2, error: None },
            Inbound::Publication {
                channel: "#42".into(),
                data: "x".into()
            },
            Inbound::Ignored,
        ]
    );
}

#[test]
fn test_decode_invalid_line_does_not_hide_the_rest() {
    let frame = format!("not json\n{}", json!({"id": 2, "subscribe": {}}));
    let decoded = decode_frame(&frame);
    assert_eq!(decoded.len(), 2);
    assert!(decoded[0].is_err());
    assert_eq!(
        decoded[1].as_ref().unwrap(),
        &Inbound::CommandReply { id: 2, error: None }
    );
}

#[test]
fn test_reconnect_policy_backoff() {
    let policy = ReconnectPolicy::default();
    assert_eq!(policy.delay(0), Duration::from_millis(500));
    assert_eq!(policy.delay(1), Duration::from_secs(1));
    assert_eq!(policy.delay(3), Duration::from_secs(4));
    assert_eq!(policy.delay(6), Duration::from_secs(20));
    assert_eq!(policy.delay(u32::MAX), Duration::from_secs(20));
}
