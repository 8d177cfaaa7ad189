//! Unit tests for the realtime channel protocol helpers.
//!
//! Run with: cargo test --test realtime_test

use serde_json::json;
use water_monitor::backend::realtime::{
    channel_topic, classify, join_message, socket_url, ChannelSignal, PhoenixMessage,
};
use water_monitor::pipeline::Reading;

fn frame(value: serde_json::Value) -> PhoenixMessage {
    serde_json::from_value(value).unwrap()
}

const TOPIC: &str = "realtime:mediciones_updates";

#[test]
fn socket_url_swaps_scheme() {
    assert_eq!(
        socket_url("https://abc.supabase.co/", "anon"),
        "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
    );
    assert_eq!(
        socket_url("http://localhost:54321", "k"),
        "ws://localhost:54321/realtime/v1/websocket?apikey=k&vsn=1.0.0"
    );
}

#[test]
fn join_subscribes_to_inserts() {
    assert_eq!(channel_topic("mediciones"), TOPIC);

    let join = join_message(TOPIC, "mediciones", Some("jwt"));
    assert_eq!(join.event, "phx_join");
    assert_eq!(join.msg_ref.as_deref(), Some("1"));

    let changes = &join.payload["config"]["postgres_changes"][0];
    assert_eq!(changes["event"], "INSERT");
    assert_eq!(changes["schema"], "public");
    assert_eq!(changes["table"], "mediciones");
    assert_eq!(join.payload["access_token"], "jwt");

    let wire = serde_json::to_value(&join).unwrap();
    assert_eq!(wire["ref"], "1");

    let anonymous = join_message(TOPIC, "mediciones", None);
    assert!(anonymous.payload.get("access_token").is_none());
}

#[test]
fn join_reply_status() {
    let ok = frame(json!({
        "topic": TOPIC, "event": "phx_reply", "ref": "1",
        "payload": { "status": "ok", "response": {} }
    }));
    assert!(matches!(classify(TOPIC, &ok), ChannelSignal::Joined));

    let refused = frame(json!({
        "topic": TOPIC, "event": "phx_reply", "ref": "1",
        "payload": { "status": "error", "response": { "reason": "unauthorized" } }
    }));
    assert!(matches!(classify(TOPIC, &refused), ChannelSignal::Failed(_)));
}

#[test]
fn heartbeat_replies_are_ignored() {
    let reply = frame(json!({
        "topic": "phoenix", "event": "phx_reply", "ref": "1",
        "payload": { "status": "ok", "response": {} }
    }));
    assert!(matches!(classify(TOPIC, &reply), ChannelSignal::Ignore));

    let later_reply = frame(json!({
        "topic": TOPIC, "event": "phx_reply", "ref": "7",
        "payload": { "status": "ok" }
    }));
    assert!(matches!(classify(TOPIC, &later_reply), ChannelSignal::Ignore));
}

#[test]
fn postgres_insert_carries_record() {
    let insert = frame(json!({
        "topic": TOPIC, "event": "postgres_changes", "ref": null,
        "payload": { "data": {
            "type": "INSERT",
            "table": "mediciones",
            "record": { "id": 5, "device_id": "AA:BB:CC:DD:EE:FF", "ph": "7.2", "es_potable": true }
        }}
    }));

    let ChannelSignal::Insert(raw) = classify(TOPIC, &insert) else {
        panic!("expected insert");
    };
    let reading = Reading::from(raw);
    assert_eq!(reading.record_id.as_deref(), Some("5"));
    assert_eq!(reading.ph, 7.2);
    assert!(reading.is_potable);

    let update = frame(json!({
        "topic": TOPIC, "event": "postgres_changes",
        "payload": { "data": { "type": "UPDATE", "record": { "id": 5 } } }
    }));
    assert!(matches!(classify(TOPIC, &update), ChannelSignal::Ignore));
}

#[test]
fn legacy_insert_event() {
    let insert = frame(json!({
        "topic": TOPIC, "event": "INSERT",
        "payload": { "record": { "id": 9, "tds": 300 } }
    }));
    assert!(matches!(classify(TOPIC, &insert), ChannelSignal::Insert(_)));
}

#[test]
fn server_errors_fail_the_channel() {
    for event in ["phx_error", "phx_close"] {
        let f = frame(json!({ "topic": TOPIC, "event": event, "payload": {} }));
        assert!(matches!(classify(TOPIC, &f), ChannelSignal::Failed(_)), "{event}");
    }

    let system = frame(json!({
        "topic": TOPIC, "event": "system",
        "payload": { "status": "error", "message": "invalid JWT" }
    }));
    let ChannelSignal::Failed(reason) = classify(TOPIC, &system) else {
        panic!("expected failure");
    };
    assert!(reason.contains("invalid JWT"));

    let system_ok = frame(json!({
        "topic": TOPIC, "event": "system",
        "payload": { "status": "ok", "message": "Subscribed to PostgreSQL" }
    }));
    assert!(matches!(classify(TOPIC, &system_ok), ChannelSignal::Ignore));
}
