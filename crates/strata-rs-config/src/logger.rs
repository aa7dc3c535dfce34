//! Injectable log sink for the engine.

use log::{Level, Log, Record};
use std::fmt;
use std::sync::Arc;

/// Target attached to every engine record.
pub(crate) const LOG_TARGET: &str = "strata_rs_config";

/// Dispatches records to an injected sink, or to the global `log` logger.
#[derive(Clone, Default)]
pub(crate) struct Logger {
    sink: Option<Arc<dyn Log>>,
}

impl Logger {
    pub(crate) fn new(sink: Option<Arc<dyn Log>>) -> Self {
        Self { sink }
    }

    pub(crate) fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub(crate) fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub(crate) fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub(crate) fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .args(args)
            .level(level)
            .target(LOG_TARGET)
            .module_path_static(Some(module_path!()))
            .build();
        match &self.sink {
            Some(sink) => {
                if sink.enabled(record.metadata()) {
                    sink.log(&record);
                }
            }
            None => {
                if level <= log::max_level() && log::logger().enabled(record.metadata()) {
                    log::logger().log(&record);
                }
            }
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("injected", &self.sink.is_some())
            .finish()
    }
}
