//! Tests for the merge/resolve engine.

use super::*;
use crate::{DefaultDecoder, PlaceholderResolver};
use pretty_assertions::assert_eq;
use serde_json::json;

fn reader() -> Reader {
    Reader::new(
        Arc::new(DefaultDecoder::default()),
        Arc::new(PlaceholderResolver),
    )
}

fn json_kv(key: &str, value: serde_json::Value) -> KeyValue {
    KeyValue::new(key, value.to_string(), "json")
}

#[test]
fn merging_the_same_batch_twice_is_idempotent() {
    let batch = vec![
        json_kv("a.json", json!({ "server": { "port": 8080 }, "name": "${server.port}" })),
        KeyValue::new("b.yaml", "server:\n  host: localhost\n", "yaml"),
    ];

    let once = reader();
    once.merge(&batch).expect("merge");
    once.resolve().expect("resolve");

    let twice = reader();
    twice.merge(&batch).expect("merge");
    twice.merge(&batch).expect("merge again");
    twice.resolve().expect("resolve");

    assert_eq!(once.snapshot(), twice.snapshot());
}

#[test]
fn last_write_wins_regardless_of_format() {
    let reader = reader();
    reader
        .merge(&[
            json_kv("a.json", json!({ "server": { "port": 8080, "host": "a" } })),
            KeyValue::new("b.yaml", "server:\n  port: 9090\n", "yaml"),
            KeyValue::new("server.host", "b", ""),
        ])
        .expect("merge");
    reader.resolve().expect("resolve");

    assert_eq!(reader.value("server.port"), Some(Node::Int(9090)));
    assert_eq!(reader.value("server.host"), Some(Node::from("b")));
}

#[test]
fn lists_and_scalars_are_replaced_whole() {
    let reader = reader();
    reader
        .merge(&[
            json_kv("a", json!({ "tags": ["a", "b", "c"], "limits": { "cpu": 1 } })),
            json_kv("b", json!({ "tags": ["z"], "limits": 5 })),
        ])
        .expect("merge");
    reader.resolve().expect("resolve");

    assert_eq!(reader.value("tags"), Some(Node::from(json!(["z"]))));
    assert_eq!(reader.value("limits"), Some(Node::Int(5)));
}

#[test]
fn decode_failure_keeps_earlier_fragments_of_the_batch() {
    // Partial apply: the batch is not atomic across fragments.
    let reader = reader();
    let err = reader
        .merge(&[
            json_kv("good", json!({ "first": 1 })),
            KeyValue::new("bad", "{ broken", "json"),
            json_kv("after", json!({ "third": 3 })),
        ])
        .unwrap_err();
    assert!(matches!(err, ConfigError::Decode { ref key, .. } if key == "bad"));

    reader.resolve().expect("resolve");
    assert_eq!(reader.value("first"), Some(Node::Int(1)));
    assert_eq!(reader.value("third"), None);
}

#[test]
fn resolve_failure_keeps_previous_snapshot() {
    let reader = reader();
    reader
        .merge(&[json_kv("a", json!({ "x": "1" }))])
        .expect("merge");
    reader.resolve().expect("resolve");

    reader
        .merge(&[json_kv("b", json!({ "x": "2", "y": "${missing}" }))])
        .expect("merge");
    let err = reader.resolve().unwrap_err();
    assert!(matches!(err, ConfigError::UnresolvedReference(_)));
    assert_eq!(reader.value("x"), Some(Node::from("1")));
    assert_eq!(reader.value("y"), None);
}

#[test]
fn apply_publishes_only_after_resolution() {
    let reader = reader();
    reader
        .apply(&[json_kv("a", json!({ "port": 1, "addr": ":${port}" }))])
        .expect("apply");
    assert_eq!(reader.value("addr"), Some(Node::from(":1")));

    let err = reader
        .apply(&[json_kv("b", json!({ "port": 2, "loop": "${loop}" }))])
        .unwrap_err();
    assert!(matches!(err, ConfigError::CyclicReference(_)));
    assert_eq!(reader.value("port"), Some(Node::Int(1)));
}

#[test]
fn references_follow_the_latest_merge() {
    let reader = reader();
    reader
        .apply(&[json_kv("a", json!({ "port": 1, "addr": ":${port}" }))])
        .expect("apply");
    reader
        .apply(&[json_kv("b", json!({ "port": 2 }))])
        .expect("apply");
    assert_eq!(reader.value("addr"), Some(Node::from(":2")));
}

#[test]
fn source_serializes_resolved_tree_canonically() {
    let reader = reader();
    assert_eq!(reader.source().expect("empty source"), b"{}".to_vec());

    reader
        .apply(&[json_kv("a", json!({ "b": 2, "a": "${b}" }))])
        .expect("apply");
    let source = String::from_utf8(reader.source().expect("source")).expect("utf8");
    assert_eq!(source, r#"{"a":2,"b":2}"#);
}

#[test]
fn missing_key_is_none() {
    let reader = reader();
    reader.apply(&[json_kv("a", json!({ "a": 1 }))]).expect("apply");
    assert_eq!(reader.value("b"), None);
    assert_eq!(reader.value("a.b"), None);
}
