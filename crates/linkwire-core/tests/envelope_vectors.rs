//! Envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use linkwire_core::protocol::{decode, decode_frame, encode, Envelope, MessageType};

mod vector_loader;
use vector_loader::TestVector;

fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

#[test]
fn envelope_vectors() {
    let files = [
        "envelope_full.json",
        "envelope_min.json",
        "envelope_null_data.json",
        "envelope_unknown_type.json",
        "envelope_binary_utf8.json",
        "envelope_empty_type.json",
        "envelope_missing_type.json",
        "envelope_malformed.json",
        "envelope_binary_not_utf8.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode_frame(v.frame.to_frame());

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(env.msg_type.as_str(), ex["type"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.data, ex["data"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.token.as_deref(), ex["token"].as_str(), "vector={}", v.description);
        assert_eq!(env.message_id.as_deref(), ex["messageId"].as_str(), "vector={}", v.description);

        if let Some(ts) = ex.get("timestamp").and_then(|t| t.as_i64()) {
            assert_eq!(env.timestamp, ts, "vector={}", v.description);
        } else {
            assert!(env.timestamp > 0, "vector={}", v.description);
        }
    }
}

#[test]
fn encode_omits_absent_optionals() {
    let env = Envelope::new(MessageType::Heartbeat, "ping");
    let json: serde_json::Value = serde_json::from_str(&encode(&env).unwrap()).unwrap();

    assert_eq!(json["type"], "heartbeat");
    assert_eq!(json["data"], "ping");
    assert!(json["timestamp"].as_i64().unwrap() > 0);
    assert!(json.get("token").is_none());
    assert!(json.get("messageId").is_none());
}

#[test]
fn encode_uses_camel_case_message_id() {
    let env = Envelope::new(MessageType::Chat, "x")
        .with_token("t")
        .with_message_id("m-1");
    let text = encode(&env).unwrap();

    assert!(text.contains("\"messageId\":\"m-1\""));
    assert!(text.contains("\"token\":\"t\""));
}

#[test]
fn unknown_type_survives_reencode() {
    let env = decode(r#"{"type":"presence","data":"online","timestamp":3}"#).unwrap();
    assert_eq!(env.msg_type, MessageType::Other("presence".into()));

    let again = decode(&encode(&env).unwrap()).unwrap();
    assert_eq!(again, env);
}
