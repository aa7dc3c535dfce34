//! Construction options for [`Config`](crate::Config).

use crate::decoder::{Decoder, DefaultDecoder};
use crate::resolver::{PlaceholderResolver, Resolver};
use log::Log;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use strata_rs_protocol::Source;

/// Delay before retrying a watcher that returned a transient error.
pub const DEFAULT_WATCH_BACKOFF: Duration = Duration::from_secs(1);

/// Options controlling decoding, resolution, sources, and logging.
#[derive(Clone)]
pub struct ConfigOptions {
    /// Decoder applied to every fragment.
    pub decoder: Arc<dyn Decoder>,
    /// Resolver applied to the merged tree.
    pub resolver: Arc<dyn Resolver>,
    /// Sources in merge order; later sources win.
    pub sources: Vec<Arc<dyn Source>>,
    /// Log sink; the global `log` logger when unset.
    pub logger: Option<Arc<dyn Log>>,
    /// Delay between retries of a failing watcher.
    pub watch_backoff: Duration,
}

impl ConfigOptions {
    /// Create options with the default decoder and resolver and no sources.
    pub fn new() -> Self {
        Self {
            decoder: Arc::new(DefaultDecoder::default()),
            resolver: Arc::new(PlaceholderResolver),
            sources: Vec::new(),
            logger: None,
            watch_backoff: DEFAULT_WATCH_BACKOFF,
        }
    }

    /// Append a source; it is merged after all previously added sources.
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Append an already shared source.
    pub fn with_shared_source(mut self, source: Arc<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    /// Replace the fragment decoder.
    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Replace the reference resolver.
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Route engine log records to `logger` instead of the global logger.
    pub fn with_logger(mut self, logger: Arc<dyn Log>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Override the retry delay for failing watchers.
    pub fn with_watch_backoff(mut self, backoff: Duration) -> Self {
        self.watch_backoff = backoff;
        self
    }
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|source| source.name()).collect();
        f.debug_struct("ConfigOptions")
            .field("sources", &sources)
            .field("logger", &self.logger.is_some())
            .field("watch_backoff", &self.watch_backoff)
            .finish_non_exhaustive()
    }
}
