//! Decoding of raw key-values into configuration trees.

use crate::codec::{CodecRegistry, builtin_codec_registry};
use crate::error::ConfigError;
use strata_rs_protocol::{KeyValue, Node};

/// Turns one [`KeyValue`] into a tree fragment ready to merge.
pub trait Decoder: Send + Sync {
    /// Decode a fragment.
    fn decode(&self, kv: &KeyValue) -> Result<Node, ConfigError>;
}

impl<F> Decoder for F
where
    F: Fn(&KeyValue) -> Result<Node, ConfigError> + Send + Sync,
{
    fn decode(&self, kv: &KeyValue) -> Result<Node, ConfigError> {
        self(kv)
    }
}

/// Decoder that dispatches on [`KeyValue::format`] through a codec registry.
///
/// - An empty format places the raw UTF-8 bytes as a string at the dotted key.
/// - A mapping document is merged at the root.
/// - A scalar or list document is mounted at the dotted key.
#[derive(Clone)]
pub struct DefaultDecoder {
    codecs: CodecRegistry,
}

impl DefaultDecoder {
    /// Create a decoder over the given registry.
    pub fn new(codecs: CodecRegistry) -> Self {
        Self { codecs }
    }

    /// Registry used for format lookup.
    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }
}

impl Default for DefaultDecoder {
    fn default() -> Self {
        Self::new(builtin_codec_registry())
    }
}

impl Decoder for DefaultDecoder {
    fn decode(&self, kv: &KeyValue) -> Result<Node, ConfigError> {
        if kv.format.is_empty() {
            let text = String::from_utf8(kv.value.clone()).map_err(|err| ConfigError::Decode {
                key: kv.key.clone(),
                format: kv.format.clone(),
                source: err.into(),
            })?;
            return mount(kv, Node::String(text));
        }

        let codec = self
            .codecs
            .get(&kv.format)
            .ok_or_else(|| ConfigError::UnsupportedFormat {
                key: kv.key.clone(),
                format: kv.format.clone(),
            })?;
        let node = codec
            .decode(&kv.value)
            .map_err(|source| ConfigError::Decode {
                key: kv.key.clone(),
                format: kv.format.clone(),
                source,
            })?;
        match node {
            Node::Map(_) => Ok(node),
            other => mount(kv, other),
        }
    }
}

/// Place a non-mapping fragment under the fragment's dotted key.
fn mount(kv: &KeyValue, leaf: Node) -> Result<Node, ConfigError> {
    if kv.key.is_empty() {
        return Err(ConfigError::Decode {
            key: kv.key.clone(),
            format: kv.format.clone(),
            source: format!("{} document needs a key to mount at", leaf.kind()).into(),
        });
    }
    Ok(Node::nested(&kv.key, leaf))
}
