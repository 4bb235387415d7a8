//! Cache Entry Module
//!
//! Defines the stored value type and individual cache entries with TTL support.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

// == Value ==
/// Opaque byte payload stored in the cache.
///
/// The protocol, the write log and the snapshot all carry the bytes
/// unchanged. `Display` is lossy and meant for logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(Vec<u8>);

impl Value {
    /// Wraps raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

// == Cache Entry ==
/// A single cache entry with value, expiry and access metadata.
///
/// Access metadata is atomic so that lookups can record recency and frequency
/// while holding the store lock in shared mode.
#[derive(Debug)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
    /// Logical clock tick at first insertion
    pub inserted_at: u64,
    last_access: AtomicU64,
    access_count: AtomicU64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry inserted (and first accessed) at clock tick `tick`.
    pub fn new(value: Value, expires_at: Option<i64>, tick: u64) -> Self {
        Self {
            value,
            expires_at,
            inserted_at: tick,
            last_access: AtomicU64::new(tick),
            access_count: AtomicU64::new(1),
        }
    }

    // == Replace ==
    /// Overwrites value and expiry in place. Insertion order is kept.
    pub fn replace(&mut self, value: Value, expires_at: Option<i64>, tick: u64) {
        self.value = value;
        self.expires_at = expires_at;
        self.touch(tick);
    }

    // == Touch ==
    /// Records an access at clock tick `tick`.
    pub fn touch(&self, tick: u64) {
        self.last_access.fetch_max(tick, Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now_ms`.
    ///
    /// An entry is visible only while its expiry is strictly in the future, so
    /// it counts as expired once `now_ms >= expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Computes an absolute expiry from a TTL. A zero TTL never expires.
pub fn expiry_from(now_ms: i64, ttl: Duration) -> Option<i64> {
    if ttl.is_zero() {
        return None;
    }
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    Some(now_ms.saturating_add(ttl_ms))
}
