//! Dynamic configuration engine.
//!
//! Loads fragments from ordered sources, merges them into one tree, resolves
//! `${path}` references, and keeps handed-out values live by watching every
//! source and notifying observers of type-compatible changes.

mod codec;
mod config;
mod decoder;
mod error;
mod logger;
mod options;
mod reader;
mod resolver;
mod value;

/// Format codecs and registry.
pub use codec::{
    Codec, CodecRegistry, Json5Codec, JsonCodec, YamlCodec, builtin_codec_registry,
    register_builtin_codecs,
};
/// Configuration facade and observer callback type.
pub use config::{Config, Observer};
/// Fragment decoders.
pub use decoder::{Decoder, DefaultDecoder};
/// Public error types.
pub use error::{CodecError, ConfigError};
/// Construction options.
pub use options::{ConfigOptions, DEFAULT_WATCH_BACKOFF};
/// Merge/resolve engine.
pub use reader::Reader;
/// Reference resolvers.
pub use resolver::{PlaceholderResolver, Resolver};
/// Value cells.
pub use value::Value;

/// Contract types re-exported for source implementors.
pub use strata_rs_protocol::{KeyValue, Kind, Node, Source, SourceError, Watcher};
