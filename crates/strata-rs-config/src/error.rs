//! Error types for merging, resolving, and reading configuration.

use strata_rs_protocol::{Kind, SourceError};
use thiserror::Error;

/// Boxed error returned by format codecs.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by the configuration engine.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key is absent from the resolved tree.
    #[error("key not found: {0}")]
    NotFound(String),
    /// Value has a different kind than requested.
    #[error("type assert error: expected {expected}, found {found}")]
    TypeAssert { expected: Kind, found: Kind },
    /// A fragment could not be decoded with its declared format.
    #[error("failed to decode config (key={key}, format={format}): {source}")]
    Decode {
        key: String,
        format: String,
        #[source]
        source: CodecError,
    },
    /// No codec is registered for the fragment's format.
    #[error("unsupported key: {key} format: {format}")]
    UnsupportedFormat { key: String, format: String },
    /// A placeholder points at a path that does not exist and has no default.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
    /// Placeholders reference each other in a loop.
    #[error("cyclic reference: {0}")]
    CyclicReference(String),
    /// A placeholder is malformed or cannot be substituted.
    #[error("invalid reference {path}: {message}")]
    InvalidReference { path: String, message: String },
    /// Source or watcher failure.
    #[error("source error: {0}")]
    Source(#[from] SourceError),
    /// Serializing the resolved tree failed.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Binding configuration into a caller type failed.
    #[error("failed to scan config: {0}")]
    Scan(#[source] serde_json::Error),
    /// A watch task ended abnormally.
    #[error("watch task failed: {0}")]
    Join(String),
}
