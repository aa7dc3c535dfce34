//! Shared contract types for Strata sources and configuration trees.
//!
//! Sources produce raw [`KeyValue`] fragments, the engine decodes them into
//! [`Node`] trees, and watchers deliver later batches until stopped.

mod node;
mod source;

/// Structured configuration tree and its kind discriminant.
pub use node::{Kind, Node};
/// Source plugin boundary.
pub use source::{KeyValue, Source, SourceError, Watcher};
