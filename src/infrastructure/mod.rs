//! Storage backends and process-level plumbing.

pub mod in_memory;
pub mod logging;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
