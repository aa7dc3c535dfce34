//! Public configuration facade: load, read, scan, watch, close.

mod watch;

use crate::error::ConfigError;
use crate::logger::Logger;
use crate::options::ConfigOptions;
use crate::reader::Reader;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strata_rs_protocol::Source;
use watch::WatchHandle;

/// Callback fired when a watched key changes to a value of the same kind.
pub type Observer = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Live, merged, and resolved view over a set of sources.
///
/// Cheap to clone; clones share state. Call [`Config::close`] to stop the
/// background watch tasks.
#[derive(Clone)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

/// State shared between the facade and every watch task.
struct ConfigInner {
    sources: Vec<Arc<dyn Source>>,
    reader: Reader,
    logger: Logger,
    watch_backoff: Duration,
    /// Values handed out so far, by key.
    cached: RwLock<HashMap<String, Value>>,
    /// Registered observers, by key.
    observers: RwLock<HashMap<String, Observer>>,
    /// One entry per watched source, drained by `close`.
    watchers: Mutex<Vec<WatchHandle>>,
}

impl Config {
    /// Build an unloaded config. No source is contacted until [`Config::load`].
    pub fn new(options: ConfigOptions) -> Self {
        let ConfigOptions {
            decoder,
            resolver,
            sources,
            logger,
            watch_backoff,
        } = options;
        let logger = Logger::new(logger);
        Self {
            inner: Arc::new(ConfigInner {
                sources,
                reader: Reader::with_logger(decoder, resolver, logger.clone()),
                logger,
                watch_backoff,
                cached: RwLock::new(HashMap::new()),
                observers: RwLock::new(HashMap::new()),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Load every source in order, start one watch task per source, then
    /// resolve.
    ///
    /// Fails fast: the first load, merge, watch, or resolve error is returned
    /// and the remaining sources are skipped. Calling `load` again re-runs the
    /// whole sequence and starts additional watch tasks.
    pub async fn load(&self) -> Result<(), ConfigError> {
        let inner = &self.inner;
        for source in &inner.sources {
            let kvs = source.load().await.map_err(|err| {
                inner.logger.error(format_args!(
                    "failed to load config source (source={}): {err}",
                    source.name()
                ));
                err
            })?;
            for kv in &kvs {
                inner.logger.debug(format_args!(
                    "config loaded (source={}, key={}, format={})",
                    source.name(),
                    kv.key,
                    kv.format
                ));
            }

            if let Err(err) = inner.reader.merge(&kvs) {
                inner.logger.error(format_args!(
                    "failed to merge config source (source={}): {err}",
                    source.name()
                ));
                return Err(err);
            }

            let watcher = source.watch().await.map_err(|err| {
                inner.logger.error(format_args!(
                    "failed to watch config source (source={}): {err}",
                    source.name()
                ));
                err
            })?;
            let handle = watch::spawn(inner, source.name().to_string(), watcher);
            inner.watchers.lock().push(handle);
        }

        if let Err(err) = inner.reader.resolve() {
            inner
                .logger
                .error(format_args!("failed to resolve config source: {err}"));
            return Err(err);
        }
        inner.logger.info(format_args!(
            "config loaded (sources={})",
            inner.sources.len()
        ));
        Ok(())
    }

    /// Value for a dotted key.
    ///
    /// The first successful lookup caches the value; later calls return the
    /// same cell, which the watch loop updates in place. A missing key yields
    /// an uncached sentinel carrying [`ConfigError::NotFound`].
    pub fn value(&self, key: &str) -> Value {
        let cached = self.inner.cached.read().get(key).cloned();
        if let Some(value) = cached {
            return value;
        }
        match self.inner.reader.value(key) {
            Some(node) => self
                .inner
                .cached
                .write()
                .entry(key.to_string())
                .or_insert_with(|| Value::new(node))
                .clone(),
            None => Value::not_found(key),
        }
    }

    /// Deserialize the whole resolved tree into `T`.
    pub fn scan<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let data = self.inner.reader.source()?;
        serde_json::from_slice(&data).map_err(ConfigError::Scan)
    }

    /// Register `observer` for `key`, replacing any previous observer.
    ///
    /// The key must resolve at registration time. Observers run on the watch
    /// task that detected the change, so a slow observer delays later updates
    /// from that source.
    pub fn watch<F>(&self, key: &str, observer: F) -> Result<(), ConfigError>
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        if self.value(key).load().is_none() {
            return Err(ConfigError::NotFound(key.to_string()));
        }
        self.inner
            .observers
            .write()
            .insert(key.to_string(), Arc::new(observer));
        Ok(())
    }

    /// Stop every watcher and wait for the watch tasks to exit.
    ///
    /// All watchers are stopped even if one fails; the first failure is
    /// returned. No observer runs after this returns. Must not be awaited
    /// from inside an observer.
    pub async fn close(&self) -> Result<(), ConfigError> {
        let handles = std::mem::take(&mut *self.inner.watchers.lock());
        let mut first_err = None;
        for handle in &handles {
            if let Err(err) = handle.stop() {
                self.inner.logger.warn(format_args!(
                    "failed to stop watcher (source={}): {err}",
                    handle.source()
                ));
                first_err.get_or_insert(ConfigError::from(err));
            }
        }
        for handle in handles {
            if let Err(err) = handle.join().await {
                first_err.get_or_insert(err);
            }
        }
        self.inner.logger.info(format_args!("config closed"));
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl ConfigInner {
    /// Push the latest resolved values into cached cells.
    ///
    /// Only keys already handed out are compared. A cell is updated when the
    /// key still resolves, the kind is unchanged, and the content differs;
    /// kind changes are dropped so typed holders never see a new shape.
    fn propagate(&self, stopped: impl Fn() -> bool) {
        let cached: Vec<(String, Value)> = self
            .cached
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in cached {
            let Some(next) = self.reader.value(&key) else {
                continue;
            };
            let Some(previous) = value.load() else {
                continue;
            };
            if next.kind() != previous.kind() {
                self.logger.warn(format_args!(
                    "dropping config update with changed type (key={key}, cached={}, next={})",
                    previous.kind(),
                    next.kind()
                ));
                continue;
            }
            if next == previous {
                continue;
            }

            value.store(next);
            self.logger
                .debug(format_args!("config value changed (key={key})"));
            let observer = self.observers.read().get(&key).cloned();
            if let Some(observer) = observer {
                if stopped() {
                    return;
                }
                observer(&key, &value);
            }
        }
    }
}
