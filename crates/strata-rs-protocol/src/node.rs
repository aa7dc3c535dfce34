//! Structured configuration tree shared by decoders, the reader, and values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between segments of a configuration path.
const PATH_SEPARATOR: char = '.';

/// Dynamically typed configuration node.
///
/// Mappings use a `BTreeMap` so serialization is canonical (sorted keys) and
/// resolution walks keys in a deterministic order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Explicit null leaf.
    #[default]
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Signed integer leaf.
    Int(i64),
    /// Floating point leaf.
    Float(f64),
    /// String leaf.
    String(String),
    /// Ordered sequence.
    List(Vec<Node>),
    /// Nested mapping keyed by path segment.
    Map(BTreeMap<String, Node>),
}

/// Discriminant of a [`Node`], used to guard typed updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
}

impl Kind {
    /// Stable lowercase name for logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::List => "list",
            Kind::Map => "map",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    /// Create an empty mapping node.
    pub fn empty_map() -> Self {
        Node::Map(BTreeMap::new())
    }

    /// Return the kind discriminant for this node.
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Bool(_) => Kind::Bool,
            Node::Int(_) => Kind::Int,
            Node::Float(_) => Kind::Float,
            Node::String(_) => Kind::String,
            Node::List(_) => Kind::List,
            Node::Map(_) => Kind::Map,
        }
    }

    /// Borrow the mapping entries when this node is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a dotted path (`server.http.port`) through nested mappings.
    pub fn get_path(&self, path: &str) -> Option<&Node> {
        path.split(PATH_SEPARATOR)
            .try_fold(self, |node, segment| node.as_map()?.get(segment))
    }

    /// Wrap `leaf` in one mapping per segment of a dotted path.
    ///
    /// `nested("a.b", leaf)` yields `{a: {b: leaf}}`.
    pub fn nested(path: &str, leaf: Node) -> Node {
        path.rsplit(PATH_SEPARATOR).fold(leaf, |inner, segment| {
            let mut map = BTreeMap::new();
            map.insert(segment.to_string(), inner);
            Node::Map(map)
        })
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(flag) => Node::Bool(flag),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Node::Int(int),
                None => Node::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(text) => Node::String(text),
            serde_json::Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            serde_json::Value::Object(map) => Node::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Node> for serde_json::Value {
    fn from(node: Node) -> Self {
        match node {
            Node::Null => serde_json::Value::Null,
            Node::Bool(flag) => serde_json::Value::Bool(flag),
            Node::Int(int) => serde_json::Value::Number(int.into()),
            // JSON has no NaN/infinity; they degrade to null.
            Node::Float(float) => serde_json::Number::from_f64(float)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Node::String(text) => serde_json::Value::String(text),
            Node::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Node::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, serde_json::Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}
