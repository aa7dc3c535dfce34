//! Format codecs and the name-keyed codec registry.

use crate::error::CodecError;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use strata_rs_protocol::Node;

/// Turns raw bytes of one declared format into a [`Node`].
pub trait Codec: Send + Sync {
    /// Format name this codec is registered under.
    fn name(&self) -> &str;

    /// Decode raw bytes into a tree.
    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Node::from(value))
    }
}

/// JSON5 codec backed by `json5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json5Codec;

impl Codec for Json5Codec {
    fn name(&self) -> &str {
        "json5"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        let contents = std::str::from_utf8(bytes)?;
        let value: serde_json::Value = json5::from_str(contents)?;
        Ok(Node::from(value))
    }
}

/// YAML codec backed by `serde_yaml`.
#[derive(Debug, Clone, Copy)]
pub struct YamlCodec {
    name: &'static str,
}

impl YamlCodec {
    /// YAML codec registered as `yaml`.
    pub const fn new() -> Self {
        Self { name: "yaml" }
    }

    /// YAML codec registered under the `yml` alias.
    pub const fn yml() -> Self {
        Self { name: "yml" }
    }
}

impl Default for YamlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for YamlCodec {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, CodecError> {
        let value: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
        yaml_to_node(value)
    }
}

/// Convert a YAML value, stringifying scalar mapping keys.
fn yaml_to_node(value: serde_yaml::Value) -> Result<Node, CodecError> {
    use serde_yaml::Value;
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(flag) => Node::Bool(flag),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Node::Int(int),
            None => Node::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => Node::String(text),
        Value::Sequence(items) => Node::List(
            items
                .into_iter()
                .map(yaml_to_node)
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(mapping) => {
            let mut map = std::collections::BTreeMap::new();
            for (key, value) in mapping {
                let key = match key {
                    Value::String(text) => text,
                    Value::Bool(flag) => flag.to_string(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(format!("unsupported yaml mapping key: {other:?}").into());
                    }
                };
                map.insert(key, yaml_to_node(value)?);
            }
            Node::Map(map)
        }
        Value::Tagged(tagged) => yaml_to_node(tagged.value)?,
    })
}

/// Registry mapping format names to codecs.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    /// Map of format name to codec.
    codecs: Arc<RwLock<HashMap<String, Arc<dyn Codec>>>>,
}

impl CodecRegistry {
    /// Create an empty codec registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec under its name, replacing any previous one.
    pub fn register(&self, codec: Arc<dyn Codec>) {
        debug!("registering codec (name={})", codec.name());
        self.codecs.write().insert(codec.name().to_string(), codec);
    }

    /// Fetch a codec by format name.
    pub fn get(&self, format: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.read().get(format).cloned()
    }

    /// List all registered format names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.codecs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Build a registry with the built-in codecs registered.
pub fn builtin_codec_registry() -> CodecRegistry {
    let registry = CodecRegistry::new();
    register_builtin_codecs(&registry);
    registry
}

/// Register the built-in `json`, `json5`, `yaml`, and `yml` codecs.
pub fn register_builtin_codecs(registry: &CodecRegistry) {
    registry.register(Arc::new(JsonCodec));
    registry.register(Arc::new(Json5Codec));
    registry.register(Arc::new(YamlCodec::new()));
    registry.register(Arc::new(YamlCodec::yml()));
}

#[cfg(test)]
mod tests {
    use super::{Codec, JsonCodec, Json5Codec, YamlCodec, builtin_codec_registry};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strata_rs_protocol::Node;

    #[test]
    fn builtin_registry_lists_formats() {
        let registry = builtin_codec_registry();
        assert_eq!(registry.list(), vec!["json", "json5", "yaml", "yml"]);
        assert!(registry.get("toml").is_none());
    }

    #[test]
    fn formats_decode_to_the_same_tree() {
        let expected = Node::from(json!({ "server": { "port": 8080, "tags": ["a", "b"] } }));
        let from_json = JsonCodec
            .decode(br#"{"server":{"port":8080,"tags":["a","b"]}}"#)
            .expect("json");
        let from_json5 = Json5Codec
            .decode(b"{ server: { port: 8080, tags: ['a', 'b'] } }")
            .expect("json5");
        let from_yaml = YamlCodec::new()
            .decode(b"server:\n  port: 8080\n  tags: [a, b]\n")
            .expect("yaml");
        assert_eq!(from_json, expected);
        assert_eq!(from_json5, expected);
        assert_eq!(from_yaml, expected);
    }

    #[test]
    fn yaml_numeric_keys_become_strings() {
        let node = YamlCodec::new().decode(b"codes:\n  404: missing\n").expect("yaml");
        assert_eq!(node, Node::from(json!({ "codes": { "404": "missing" } })));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(JsonCodec.decode(b"{ not json").is_err());
    }
}
