//! Per-source watch loop.

use super::ConfigInner;
use crate::error::ConfigError;
use std::sync::{Arc, Weak};
use strata_rs_protocol::{SourceError, Watcher};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Retained handle for one source's watcher and its background task.
pub(super) struct WatchHandle {
    source: String,
    watcher: Arc<dyn Watcher>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub(super) fn source(&self) -> &str {
        &self.source
    }

    /// Stop the watcher and raise the loop's stop signal.
    pub(super) fn stop(&self) -> Result<(), SourceError> {
        self.stop.send_replace(true);
        self.watcher.stop()
    }

    /// Wait for the loop task to exit.
    pub(super) async fn join(self) -> Result<(), ConfigError> {
        self.task
            .await
            .map_err(|err| ConfigError::Join(format!("source={}: {err}", self.source)))
    }
}

/// Start the watch loop for one source.
///
/// The task holds only a weak reference to the config, so dropping every
/// `Config` handle also ends the loop.
pub(super) fn spawn(
    inner: &Arc<ConfigInner>,
    source: String,
    watcher: Arc<dyn Watcher>,
) -> WatchHandle {
    let (stop, stop_rx) = watch::channel(false);
    let task = tokio::spawn(run(
        Arc::downgrade(inner),
        source.clone(),
        watcher.clone(),
        stop_rx,
    ));
    WatchHandle {
        source,
        watcher,
        stop,
        task,
    }
}

async fn run(
    inner: Weak<ConfigInner>,
    source: String,
    watcher: Arc<dyn Watcher>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            return;
        }
        let next = tokio::select! {
            biased;
            _ = stop.changed() => return,
            next = watcher.next() => next,
        };
        let Some(config) = inner.upgrade() else {
            return;
        };

        let kvs = match next {
            Ok(kvs) => kvs,
            Err(SourceError::Canceled) => {
                config.logger.info(format_args!(
                    "watcher canceled, stopping watch loop (source={source})"
                ));
                return;
            }
            Err(err) => {
                config.logger.error(format_args!(
                    "failed to watch next config (source={source}): {err}"
                ));
                let backoff = config.watch_backoff;
                drop(config);
                tokio::select! {
                    biased;
                    _ = stop.changed() => return,
                    _ = tokio::time::sleep(backoff) => {}
                }
                continue;
            }
        };

        if let Err(err) = config.reader.apply(&kvs) {
            config.logger.error(format_args!(
                "failed to apply config update (source={source}, fragments={}): {err}",
                kvs.len()
            ));
            continue;
        }
        config.logger.debug(format_args!(
            "config update applied (source={source}, fragments={})",
            kvs.len()
        ));
        config.propagate(|| *stop.borrow());
    }
}
