//! Merge/resolve engine owning the merged and resolved configuration trees.
//!
//! Writers (initial load and every watch loop) are serialized on the merged
//! tree's mutex. Readers only touch the resolved snapshot, an `Arc<Node>`
//! swapped after each successful resolution, so a slow merge never blocks a
//! lookup.

mod merge;

#[cfg(test)]
mod tests;

use crate::decoder::Decoder;
use crate::error::ConfigError;
use crate::logger::Logger;
use crate::resolver::Resolver;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use strata_rs_protocol::{KeyValue, Node};

/// Owns the merged tree and the last good resolved snapshot.
pub struct Reader {
    decoder: Arc<dyn Decoder>,
    resolver: Arc<dyn Resolver>,
    logger: Logger,
    /// Merged, unresolved tree. Its lock is the single-writer lock.
    merged: Mutex<Node>,
    /// Last successfully resolved tree.
    resolved: RwLock<Arc<Node>>,
}

impl Reader {
    /// Create an empty reader with the given decoder and resolver.
    pub fn new(decoder: Arc<dyn Decoder>, resolver: Arc<dyn Resolver>) -> Self {
        Self::with_logger(decoder, resolver, Logger::default())
    }

    pub(crate) fn with_logger(
        decoder: Arc<dyn Decoder>,
        resolver: Arc<dyn Resolver>,
        logger: Logger,
    ) -> Self {
        Self {
            decoder,
            resolver,
            logger,
            merged: Mutex::new(Node::empty_map()),
            resolved: RwLock::new(Arc::new(Node::empty_map())),
        }
    }

    /// Decode and merge fragments in order, last write wins per leaf path.
    ///
    /// Stops at the first fragment that fails to decode. Fragments applied
    /// before it in the same call stay merged.
    pub fn merge(&self, kvs: &[KeyValue]) -> Result<(), ConfigError> {
        let mut merged = self.merged.lock();
        self.merge_locked(&mut merged, kvs)
    }

    /// Resolve the merged tree and publish it as the new snapshot.
    ///
    /// On failure the previous snapshot stays in place.
    pub fn resolve(&self) -> Result<(), ConfigError> {
        let merged = self.merged.lock();
        self.resolve_locked(&merged)
    }

    /// Merge then resolve while holding the writer lock across both steps.
    pub fn apply(&self, kvs: &[KeyValue]) -> Result<(), ConfigError> {
        let mut merged = self.merged.lock();
        self.merge_locked(&mut merged, kvs)?;
        self.resolve_locked(&merged)
    }

    /// Look up a dotted path in the resolved snapshot.
    pub fn value(&self, key: &str) -> Option<Node> {
        self.snapshot().get_path(key).cloned()
    }

    /// Current resolved snapshot.
    pub fn snapshot(&self) -> Arc<Node> {
        self.resolved.read().clone()
    }

    /// Serialize the resolved snapshot as canonical JSON.
    pub fn source(&self) -> Result<Vec<u8>, ConfigError> {
        serde_json::to_vec(self.snapshot().as_ref()).map_err(ConfigError::Serialize)
    }

    fn merge_locked(&self, merged: &mut Node, kvs: &[KeyValue]) -> Result<(), ConfigError> {
        for kv in kvs {
            let next = self.decoder.decode(kv).map_err(|err| {
                self.logger.error(format_args!(
                    "failed to decode config (key={}, format={}): {err}",
                    kv.key, kv.format
                ));
                err
            })?;
            merge::merge_nodes(merged, next);
        }
        Ok(())
    }

    fn resolve_locked(&self, merged: &Node) -> Result<(), ConfigError> {
        let resolved = self.resolver.resolve(merged)?;
        *self.resolved.write() = Arc::new(resolved);
        Ok(())
    }
}
