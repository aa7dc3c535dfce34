//! Public SDK surface for Strata.
//!
//! This crate re-exports the configuration engine and its contract types and
//! provides a small initialization helper to keep consumer setup consistent.

/// Re-export for convenience.
pub use strata_rs_config as config;
/// Re-export for convenience.
pub use strata_rs_protocol as protocol;

pub use strata_rs_config::{Config, ConfigError, ConfigOptions, Value};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// This is a no-op if the feature is not enabled. Engine records use the
/// `strata_rs_config` target unless a logger is injected through
/// [`ConfigOptions::with_logger`].
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
