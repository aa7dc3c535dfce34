//! Test helpers shared across Strata crates.

pub mod logger;
pub mod source;

pub use logger::CapturingLogger;
pub use source::{FailingSource, MemorySource, MemoryWatcher, json_kv};
