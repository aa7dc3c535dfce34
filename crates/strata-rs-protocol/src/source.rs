//! Source and watcher contracts consumed by the configuration engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One raw configuration fragment as produced by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Fragment key, e.g. a file name or a dotted environment key.
    pub key: String,
    /// Raw encoded bytes.
    pub value: Vec<u8>,
    /// Registered decoder name (`json`, `yaml`, ...); empty for raw strings.
    pub format: String,
}

impl KeyValue {
    /// Build a fragment from its parts.
    pub fn new(
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            format: format.into(),
        }
    }
}

/// Errors returned by sources and watchers.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The watch was stopped; terminal for the watcher.
    #[error("watch canceled")]
    Canceled,
    /// Backend temporarily unreachable.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other source failure.
    #[error("source error: {0}")]
    Other(String),
}

impl SourceError {
    /// Whether this error marks a stopped watch.
    pub fn is_canceled(&self) -> bool {
        matches!(self, SourceError::Canceled)
    }
}

#[async_trait]
/// Provider of raw configuration fragments plus a change handle.
pub trait Source: Send + Sync {
    /// Human-readable label used in logs.
    fn name(&self) -> &str {
        "source"
    }

    /// Fetch the current fragments.
    async fn load(&self) -> Result<Vec<KeyValue>, SourceError>;

    /// Obtain a handle delivering future change batches.
    async fn watch(&self) -> Result<Arc<dyn Watcher>, SourceError>;
}

#[async_trait]
/// Per-source handle yielding successive change batches.
///
/// `next` and `stop` may be called concurrently from different tasks.
pub trait Watcher: Send + Sync {
    /// Wait for the next batch. Returns [`SourceError::Canceled`] once stopped.
    async fn next(&self) -> Result<Vec<KeyValue>, SourceError>;

    /// Stop the watch. Idempotent; pending and future `next` calls return
    /// [`SourceError::Canceled`].
    fn stop(&self) -> Result<(), SourceError>;
}
