//! Cache Module
//!
//! Provides the in-memory cache engine with TTL expiration and
//! capacity-driven eviction (LRU, FIFO or LFU).

mod engine;
mod entry;
mod eviction;
mod stats;
mod store;


// Re-export public types
pub use engine::{Cache, SnapshotExport};
pub use entry::{current_timestamp_ms, expiry_from, CacheEntry, Value};
pub use eviction::{select_victim, AccessClock, EvictionPolicy};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{normalize_key, CacheStore, Lookup, SetOutcome, StoredEntry};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
