//! Cache Store Module
//!
//! Key-value storage enforcing TTL expiry, the capacity limit and the
//! configured eviction policy. The store itself is not synchronised; the
//! engine wraps it in a reader/writer lock.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::eviction::{select_victim, AccessClock};
use crate::cache::{
    current_timestamp_ms, expiry_from, CacheEntry, CacheStats, EvictionPolicy, StatsSnapshot,
    Value, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

// == Outcomes ==
/// What a `set` call did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// A new key was stored, possibly after evicting `evicted`
    Inserted { evicted: Option<String> },
    /// An existing key got a new value or expiry
    Updated,
    /// Same key and value were already live; nothing changed
    Unchanged,
}

impl SetOutcome {
    /// True when the store was mutated.
    pub fn is_write(&self) -> bool {
        !matches!(self, SetOutcome::Unchanged)
    }
}

/// Result of a shared-mode lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(Value),
    /// Present but logically expired; the caller should remove it
    Expired,
    Missing,
}

/// Owned copy of one entry, used to move state in and out of snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub value: Value,
    /// Unix milliseconds, None = never expires
    pub expires_at: Option<i64>,
}

// == Key Normalization ==
/// Folds a key to its canonical case-insensitive form.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

// == Cache Store ==
/// Cache storage with TTL, capacity-driven eviction and a dirty marker.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage, keyed by normalized key
    entries: HashMap<String, CacheEntry>,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL applied when a write does not carry one; zero = never expires
    default_ttl: Duration,
    policy: EvictionPolicy,
    clock: AccessClock,
    stats: CacheStats,
    /// Unsaved mutations since the last snapshot
    dirty: bool,
    /// Bumped on every dirtying mutation
    generation: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL for entries written without an explicit one
    /// * `policy` - Eviction policy used when the store is full
    pub fn new(capacity: usize, default_ttl: Duration, policy: EvictionPolicy) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(4096)),
            capacity,
            default_ttl,
            policy,
            clock: AccessClock::new(),
            stats: CacheStats::new(),
            dirty: false,
            generation: 0,
        }
    }

    pub fn from_options(options: &CacheOptions) -> Self {
        Self::new(options.capacity, options.ttl, options.strategy)
    }

    // == Set ==
    /// Stores a key-value pair, evicting one entry first if a new key would
    /// exceed capacity.
    ///
    /// A write of the value a key already holds (and which is still live) is
    /// suppressed and reported as [`SetOutcome::Unchanged`].
    ///
    /// # Arguments
    /// * `key` - The key to store; case-insensitive
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL override (store default if None, zero = never)
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<Duration>) -> Result<SetOutcome> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let key = normalize_key(key);
        let now = current_timestamp_ms();

        if let Some(existing) = self.entries.get(&key) {
            if !existing.is_expired_at(now) && existing.value == value {
                return Ok(SetOutcome::Unchanged);
            }
        }

        let expires_at = expiry_from(now, ttl.unwrap_or(self.default_ttl));
        let tick = self.clock.tick();

        let outcome = match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.replace(value, expires_at, tick);
                SetOutcome::Updated
            }
            None => {
                let evicted = self.insert_new(key, value, expires_at, tick)?;
                SetOutcome::Inserted { evicted }
            }
        };

        self.mark_dirty();
        Ok(outcome)
    }

    /// Inserts an absent key, evicting one victim when the store is full.
    fn insert_new(
        &mut self,
        key: String,
        value: Value,
        expires_at: Option<i64>,
        tick: u64,
    ) -> Result<Option<String>> {
        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            self.cleanup_expired();
        }
        if self.entries.len() >= self.capacity {
            let victim = select_victim(self.policy, &self.entries)
                .map(str::to_owned)
                .ok_or_else(|| {
                    CacheError::CapacityExceeded(format!(
                        "no eviction candidate for key '{}' at capacity {}",
                        key, self.capacity
                    ))
                })?;
            self.entries.remove(&victim);
            self.stats.record_eviction();
            evicted = Some(victim);
        }

        self.entries.insert(key, CacheEntry::new(value, expires_at, tick));
        Ok(evicted)
    }

    // == Lookup ==
    /// Reads a key without removing anything. Needs only shared access.
    ///
    /// A hit records the access for LRU/LFU bookkeeping.
    pub fn lookup(&self, key: &str) -> Lookup {
        let key = normalize_key(key);
        match self.entries.get(&key) {
            None => {
                self.stats.record_miss();
                Lookup::Missing
            }
            Some(entry) if entry.is_expired_at(current_timestamp_ms()) => {
                self.stats.record_miss();
                Lookup::Expired
            }
            Some(entry) => {
                entry.touch(self.clock.tick());
                self.stats.record_hit();
                Lookup::Hit(entry.value.clone())
            }
        }
    }

    // == Get ==
    /// Retrieves a value, removing it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        match self.lookup(key) {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired => {
                self.remove_if_expired(key);
                None
            }
            Lookup::Missing => None,
        }
    }

    // == Remove If Expired ==
    /// Lazily drops a key if it is still expired.
    ///
    /// Expiry cleanup does not mark the store dirty.
    pub fn remove_if_expired(&mut self, key: &str) -> bool {
        let key = normalize_key(key);
        let now = current_timestamp_ms();
        let expired = self
            .entries
            .get(&key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.entries.remove(&key);
            self.stats.record_expirations(1);
        }
        expired
    }

    // == Delete ==
    /// Removes a live entry by key, returning whether one was removed.
    ///
    /// An expired entry is dropped as an expiry and reported as absent.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.remove_if_expired(key) {
            return false;
        }
        let removed = self.entries.remove(&normalize_key(key)).is_some();
        if removed {
            self.mark_dirty();
        }
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();
        self.stats.record_expirations(removed);
        removed
    }

    // == Describe ==
    /// Human-readable summary of size, limits and per-key expiry.
    pub fn describe(&self) -> String {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();

        let mut out = String::new();
        let _ = write!(
            out,
            "Cache{{capacity: {}, size: {}, ",
            self.capacity,
            self.entries.len()
        );
        if self.default_ttl.is_zero() {
            out.push_str("ttl: none, ");
        } else {
            let _ = write!(out, "ttl: {:?}, ", self.default_ttl);
        }
        let _ = write!(out, "policy: {}, {}, entries: [", self.policy, self.stats());

        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let expiry = self.entries[key]
                .expires_at
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            let _ = write!(out, "{} (expires: {})", key, expiry);
        }
        out.push_str("]}");
        out
    }

    // == Snapshot Support ==
    /// Copies every entry out of the store, sorted by key.
    pub fn export(&self) -> Vec<StoredEntry> {
        let mut exported: Vec<StoredEntry> = self
            .entries
            .iter()
            .map(|(key, entry)| StoredEntry {
                key: key.clone(),
                value: entry.value.clone(),
                expires_at: entry.expires_at,
            })
            .collect();
        exported.sort_by(|a, b| a.key.cmp(&b.key));
        exported
    }

    /// Replaces the whole mapping with `entries` and clears the dirty flag.
    ///
    /// Entries are inserted in key order; if they outnumber the capacity the
    /// configured policy evicts as usual. Returns the number of live entries.
    pub fn restore(&mut self, mut entries: Vec<StoredEntry>) -> usize {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        self.entries.clear();

        for stored in entries {
            let key = normalize_key(&stored.key);
            let tick = self.clock.tick();
            match self.entries.get_mut(&key) {
                Some(entry) => entry.replace(stored.value, stored.expires_at, tick),
                None => {
                    // Only fails for a zero capacity, where nothing can be kept
                    let _ = self.insert_new(key, stored.value, stored.expires_at, tick);
                }
            }
        }

        self.dirty = false;
        self.entries.len()
    }

    // == Dirty Tracking ==
    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clears the dirty flag if no mutation happened since `generation`.
    pub fn mark_clean(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    // == Accessors ==
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
