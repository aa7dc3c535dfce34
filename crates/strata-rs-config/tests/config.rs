//! Config facade integration tests: load, lookup, scan, registration.

use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use strata_rs_config::{Config, ConfigError, ConfigOptions, KeyValue, Kind, Node};
use strata_rs_test_utils::{FailingSource, MemorySource, json_kv};

fn kv(key: &str, value: &str, format: &str) -> KeyValue {
    KeyValue::new(key, value, format)
}

/// Later sources override earlier ones at the same leaf path.
#[tokio::test]
async fn later_source_wins_on_load() {
    let first = MemorySource::new(
        "first",
        vec![json_kv("first.json", json!({"x": "a", "only_first": 1}))],
    );
    let second = MemorySource::new("second", vec![json_kv("second.json", json!({"x": "b"}))]);
    let config = Config::new(ConfigOptions::new().with_source(first).with_source(second));
    config.load().await.expect("load");

    assert_eq!(config.value("x").as_string().expect("x"), "b");
    assert_eq!(config.value("only_first").as_int().expect("only_first"), 1);
    config.close().await.expect("close");
}

/// Mixed formats merge into one tree.
#[tokio::test]
async fn merges_fragments_of_every_builtin_format() {
    let source = MemorySource::new(
        "mixed",
        vec![
            kv("app.json", r#"{"server": {"port": 80, "host": "a"}}"#, "json"),
            kv("app.yaml", "server:\n  port: 8080\n", "yaml"),
            kv("app.json5", "{server: {tls: true,}}", "json5"),
            kv("server.name", "edge", ""),
        ],
    );
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    assert_eq!(config.value("server.port").as_int().expect("port"), 8080);
    assert_eq!(config.value("server.host").as_string().expect("host"), "a");
    assert!(config.value("server.tls").as_bool().expect("tls"));
    assert_eq!(config.value("server.name").as_string().expect("name"), "edge");
    config.close().await.expect("close");
}

/// References are substituted in the values handed out.
#[tokio::test]
async fn resolves_placeholders_on_load() {
    let source = MemorySource::new(
        "refs",
        vec![json_kv(
            "app.json",
            json!({
                "port": 8080,
                "addr": "localhost:${port}",
                "copy": "${port}",
                "fallback": "${missing:none}",
            }),
        )],
    );
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    assert_eq!(
        config.value("addr").as_string().expect("addr"),
        "localhost:8080"
    );
    assert_eq!(config.value("copy").kind(), Some(Kind::Int));
    assert_eq!(config.value("fallback").as_string().expect("fallback"), "none");
    config.close().await.expect("close");
}

/// Repeated lookups return the same cell.
#[tokio::test]
async fn value_identity_is_stable() {
    let source = MemorySource::new("ids", vec![json_kv("a.json", json!({"a": {"b": 1}}))]);
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    let first = config.value("a.b");
    let second = config.value("a.b");
    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&config.value("a")));
    config.close().await.expect("close");
}

/// Missing keys yield a sentinel and are not cached.
#[tokio::test]
async fn missing_key_yields_not_found_sentinel() {
    let source = MemorySource::new("empty", vec![json_kv("a.json", json!({"a": 1}))]);
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    let missing = config.value("missing");
    assert!(missing.load().is_none());
    assert!(matches!(missing.err(), Some(ConfigError::NotFound(key)) if key == "missing"));
    assert!(!missing.ptr_eq(&config.value("missing")));
    assert!(matches!(
        missing.as_string(),
        Err(ConfigError::NotFound(_))
    ));
    config.close().await.expect("close");
}

/// The whole tree deserializes into a typed struct.
#[tokio::test]
async fn scans_resolved_tree_into_struct() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Server {
        host: String,
        port: u16,
    }
    #[derive(Debug, Deserialize, PartialEq)]
    struct App {
        name: String,
        server: Server,
    }

    let source = MemorySource::new(
        "scan",
        vec![json_kv(
            "app.json",
            json!({"name": "svc-${server.port}", "server": {"host": "h", "port": 9000}}),
        )],
    );
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    let app: App = config.scan().expect("scan");
    assert_eq!(
        app,
        App {
            name: "svc-9000".to_string(),
            server: Server {
                host: "h".to_string(),
                port: 9000,
            },
        }
    );
    let server: Server = config.value("server").scan().expect("scan server");
    assert_eq!(server.port, 9000);
    config.close().await.expect("close");
}

/// Load stops at the first failing source.
#[tokio::test]
async fn load_fails_fast_on_source_error() {
    let later = MemorySource::new("later", vec![json_kv("b.json", json!({"b": 1}))]);
    let config = Config::new(
        ConfigOptions::new()
            .with_source(FailingSource::on_load("boom"))
            .with_source(later.clone()),
    );

    let err = config.load().await.expect_err("load should fail");
    assert!(matches!(err, ConfigError::Source(_)));
    assert_eq!(later.watcher_count(), 0);
    assert!(config.value("b").load().is_none());
    config.close().await.expect("close");
}

/// A source that cannot be watched aborts load.
#[tokio::test]
async fn load_fails_when_watch_fails() {
    let source = FailingSource::on_watch(vec![json_kv("a.json", json!({"a": 1}))], "no watch");
    let config = Config::new(ConfigOptions::new().with_source(source));

    let err = config.load().await.expect_err("load should fail");
    assert!(matches!(err, ConfigError::Source(_)));
}

/// Malformed fragments surface as decode errors at load.
#[tokio::test]
async fn load_fails_on_malformed_fragment() {
    let source = MemorySource::new("bad", vec![kv("a.json", "{not json", "json")]);
    let config = Config::new(ConfigOptions::new().with_source(source));

    let err = config.load().await.expect_err("load should fail");
    assert!(matches!(err, ConfigError::Decode { .. }));
}

/// Unresolvable references fail the final resolve.
#[tokio::test]
async fn load_fails_on_unresolved_reference() {
    let source = MemorySource::new(
        "refs",
        vec![json_kv("a.json", json!({"a": "${nowhere}"}))],
    );
    let config = Config::new(ConfigOptions::new().with_source(source));

    let err = config.load().await.expect_err("load should fail");
    assert!(matches!(err, ConfigError::UnresolvedReference(path) if path == "nowhere"));
    config.close().await.expect("close");
}

/// Observers can only be registered for resolvable keys.
#[tokio::test]
async fn watch_rejects_unresolved_key() {
    let source = MemorySource::new("w", vec![json_kv("a.json", json!({"a": 1}))]);
    let config = Config::new(ConfigOptions::new().with_source(source));
    config.load().await.expect("load");

    let err = config
        .watch("missing", |_, _| {})
        .expect_err("watch should fail");
    assert!(matches!(err, ConfigError::NotFound(key) if key == "missing"));
    config.watch("a", |_, _| {}).expect("watch a");
    config.close().await.expect("close");
}

/// Reads keep working on the last state after close.
#[tokio::test]
async fn reads_survive_close() {
    let source = MemorySource::new("c", vec![json_kv("a.json", json!({"a": [1, 2]}))]);
    let config = Config::new(ConfigOptions::new().with_source(source.clone()));
    config.load().await.expect("load");
    config.close().await.expect("close");

    assert_eq!(source.stop_count(), 1);
    assert_eq!(
        config.value("a").load(),
        Some(Node::List(vec![Node::Int(1), Node::Int(2)]))
    );
    let items = config.value("a").as_list().expect("list");
    assert_eq!(items.len(), 2);
    config.close().await.expect("second close");
}
