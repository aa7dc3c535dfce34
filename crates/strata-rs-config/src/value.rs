//! Identity-stable configuration value cells.

use crate::error::ConfigError;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strata_rs_protocol::{Kind, Node};

/// Shared handle to the current content of one configuration key.
///
/// Clones share the same cell: when the watch loop stores a new node, every
/// holder observes it. A value may instead be an error sentinel (for example
/// a lookup of a missing key), in which case [`Value::load`] returns `None`
/// and [`Value::err`] describes why.
#[derive(Clone)]
pub struct Value {
    inner: Arc<Slot>,
}

enum Slot {
    Cell(RwLock<Node>),
    Fault(Fault),
}

/// Fixed error kinds carried by sentinel values.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Fault {
    NotFound(String),
    TypeAssert { expected: Kind, found: Kind },
}

impl Value {
    pub(crate) fn new(node: Node) -> Self {
        Self {
            inner: Arc::new(Slot::Cell(RwLock::new(node))),
        }
    }

    pub(crate) fn not_found(key: &str) -> Self {
        Self::fault(Fault::NotFound(key.to_string()))
    }

    fn fault(fault: Fault) -> Self {
        Self {
            inner: Arc::new(Slot::Fault(fault)),
        }
    }

    /// Current content, or `None` for error sentinels.
    pub fn load(&self) -> Option<Node> {
        match self.inner.as_ref() {
            Slot::Cell(cell) => Some(cell.read().clone()),
            Slot::Fault(_) => None,
        }
    }

    /// Replace the content in place. Sentinels ignore stores.
    pub(crate) fn store(&self, node: Node) {
        if let Slot::Cell(cell) = self.inner.as_ref() {
            *cell.write() = node;
        }
    }

    /// Kind of the current content.
    pub fn kind(&self) -> Option<Kind> {
        match self.inner.as_ref() {
            Slot::Cell(cell) => Some(cell.read().kind()),
            Slot::Fault(_) => None,
        }
    }

    /// Error carried by a sentinel value.
    pub fn err(&self) -> Option<ConfigError> {
        match self.inner.as_ref() {
            Slot::Cell(_) => None,
            Slot::Fault(fault) => Some(fault.to_error()),
        }
    }

    /// Whether both handles share the same cell.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Deserialize the current content into `T`.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let node = self.require()?;
        serde_json::from_value(serde_json::Value::from(node)).map_err(ConfigError::Scan)
    }

    /// Child value at `segment` of a mapping, detached from this cell.
    pub fn get(&self, segment: &str) -> Value {
        let node = match self.require() {
            Ok(node) => node,
            Err(_) => return self.clone(),
        };
        match node {
            Node::Map(mut map) => match map.remove(segment) {
                Some(child) => Value::new(child),
                None => Value::not_found(segment),
            },
            other => Value::fault(Fault::TypeAssert {
                expected: Kind::Map,
                found: other.kind(),
            }),
        }
    }

    /// Boolean content; strings such as `"true"` and `"0"` are parsed.
    pub fn as_bool(&self) -> Result<bool, ConfigError> {
        match self.require()? {
            Node::Bool(flag) => Ok(flag),
            Node::Int(int) => Ok(int != 0),
            Node::String(text) => parse_bool(&text).ok_or(type_assert(Kind::Bool, Kind::String)),
            other => Err(type_assert(Kind::Bool, other.kind())),
        }
    }

    /// Integer content; floats truncate and strings are parsed.
    pub fn as_int(&self) -> Result<i64, ConfigError> {
        match self.require()? {
            Node::Int(int) => Ok(int),
            Node::Float(float) => Ok(float as i64),
            Node::String(text) => text
                .trim()
                .parse()
                .map_err(|_| type_assert(Kind::Int, Kind::String)),
            other => Err(type_assert(Kind::Int, other.kind())),
        }
    }

    /// Float content; integers widen and strings are parsed.
    pub fn as_float(&self) -> Result<f64, ConfigError> {
        match self.require()? {
            Node::Float(float) => Ok(float),
            Node::Int(int) => Ok(int as f64),
            Node::String(text) => text
                .trim()
                .parse()
                .map_err(|_| type_assert(Kind::Float, Kind::String)),
            other => Err(type_assert(Kind::Float, other.kind())),
        }
    }

    /// String content; scalars are formatted.
    pub fn as_string(&self) -> Result<String, ConfigError> {
        match self.require()? {
            Node::String(text) => Ok(text),
            Node::Bool(flag) => Ok(flag.to_string()),
            Node::Int(int) => Ok(int.to_string()),
            Node::Float(float) => Ok(float.to_string()),
            other => Err(type_assert(Kind::String, other.kind())),
        }
    }

    /// Integer content read as nanoseconds; negative values clamp to zero.
    pub fn as_duration(&self) -> Result<Duration, ConfigError> {
        let nanos = self.as_int()?;
        Ok(Duration::from_nanos(u64::try_from(nanos).unwrap_or(0)))
    }

    /// List items as detached values.
    pub fn as_list(&self) -> Result<Vec<Value>, ConfigError> {
        match self.require()? {
            Node::List(items) => Ok(items.into_iter().map(Value::new).collect()),
            other => Err(type_assert(Kind::List, other.kind())),
        }
    }

    /// Mapping entries as detached values.
    pub fn as_map(&self) -> Result<BTreeMap<String, Value>, ConfigError> {
        match self.require()? {
            Node::Map(map) => Ok(map
                .into_iter()
                .map(|(key, node)| (key, Value::new(node)))
                .collect()),
            other => Err(type_assert(Kind::Map, other.kind())),
        }
    }

    fn require(&self) -> Result<Node, ConfigError> {
        match self.inner.as_ref() {
            Slot::Cell(cell) => Ok(cell.read().clone()),
            Slot::Fault(fault) => Err(fault.to_error()),
        }
    }
}

impl Fault {
    fn to_error(&self) -> ConfigError {
        match self {
            Fault::NotFound(key) => ConfigError::NotFound(key.clone()),
            Fault::TypeAssert { expected, found } => ConfigError::TypeAssert {
                expected: *expected,
                found: *found,
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_ref() {
            Slot::Cell(cell) => f.debug_tuple("Value").field(&*cell.read()).finish(),
            Slot::Fault(fault) => f.debug_tuple("Value").field(fault).finish(),
        }
    }
}

fn type_assert(expected: Kind, found: Kind) -> ConfigError {
    ConfigError::TypeAssert { expected, found }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
