//! Response caches
//!
//! [`TtlCache`] is the short-lived in-memory layer consulted before every
//! request. [`OfflineCache`] keeps the last successful payload per key on disk
//! and is only read once every retry attempt has failed.

mod memory;
mod offline;

pub use memory::TtlCache;
pub use offline::{OfflineCache, OfflineCacheEntry};
