//! Cache Engine Module
//!
//! Thread-safe cache engine shared by the server, the sweeper and the
//! snapshot task.
//!
//! # Lock modes
//! | Operation | Mode |
//! |---|---|
//! | `get` (live hit or miss), `describe`, `export_dirty` | shared |
//! | `set` (including its write log append), `delete` | exclusive |
//! | lazy expiry removal, `sweep_expired` | exclusive |
//! | `mark_saved`, `restore` | exclusive |

use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{
    normalize_key, CacheStore, Lookup, SetOutcome, StatsSnapshot, StoredEntry, Value,
};
use crate::config::CacheOptions;
use crate::error::Result;
use crate::persistence::{WriteLog, WriteLogRecord};

/// Point-in-time copy of a dirty store, tagged with the generation it reflects.
#[derive(Debug, Clone)]
pub struct SnapshotExport {
    pub generation: u64,
    pub entries: Vec<StoredEntry>,
}

// == Cache ==
/// The cache engine: a [`CacheStore`] behind a single reader/writer lock,
/// plus an optional write log for successful `set` calls.
#[derive(Debug)]
pub struct Cache {
    store: RwLock<CacheStore>,
    write_log: Option<WriteLog>,
}

impl Cache {
    // == Constructor ==
    /// Creates an engine around an existing store, without a write log.
    pub fn new(store: CacheStore) -> Self {
        Self {
            store: RwLock::new(store),
            write_log: None,
        }
    }

    /// Creates an empty engine from cache options.
    pub fn from_options(options: &CacheOptions) -> Self {
        Self::new(CacheStore::from_options(options))
    }

    /// Attaches the write log that every successful `set` appends to.
    pub fn with_write_log(mut self, write_log: WriteLog) -> Self {
        self.write_log = Some(write_log);
        self
    }

    // == Set ==
    /// Stores a value under `key`.
    ///
    /// The write log line is appended before the store lock is released, so
    /// log order matches the order writes were applied. Write log failures
    /// are logged and never fail the call. An error is returned only when
    /// the store rejects the write.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        ttl: Option<Duration>,
    ) -> Result<SetOutcome> {
        let value = value.into();
        let mut store = self.store.write().await;

        let outcome = match store.set(key, value.clone(), ttl) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(key, error = %e, "SET rejected");
                return Err(e);
            }
        };

        if let SetOutcome::Inserted {
            evicted: Some(victim),
        } = &outcome
        {
            debug!(key, evicted = %victim, "Evicted entry to stay within capacity");
        }

        if outcome.is_write() {
            self.append_write_log(key, value).await;
        }
        drop(store);

        Ok(outcome)
    }

    async fn append_write_log(&self, key: &str, value: Value) {
        let Some(write_log) = &self.write_log else {
            return;
        };

        let record = WriteLogRecord::set(normalize_key(key), value);
        if let Err(e) = write_log.append(&record).await {
            warn!(key = %record.key, error = %e, "Write log append failed, entry kept in memory only");
        }
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// A logically expired entry is removed under exclusive access and
    /// reported as missing.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let lookup = self.store.read().await.lookup(key);

        match lookup {
            Lookup::Hit(value) => Some(value),
            Lookup::Missing => None,
            Lookup::Expired => {
                let mut store = self.store.write().await;
                if store.remove_if_expired(key) {
                    debug!(key, "Removed expired entry on read");
                }
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key`, returning whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    // == Describe ==
    /// Diagnostic summary of size, capacity, TTL and per-key expiry.
    pub async fn describe(&self) -> String {
        self.store.read().await.describe()
    }

    // == Sweep Expired ==
    /// Actively removes every expired entry. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    // == Snapshot Support ==
    /// Copies the store if it has unsaved changes.
    pub async fn export_dirty(&self) -> Option<SnapshotExport> {
        let store = self.store.read().await;
        store.is_dirty().then(|| SnapshotExport {
            generation: store.generation(),
            entries: store.export(),
        })
    }

    /// Clears the dirty flag unless the store changed after `generation`.
    pub async fn mark_saved(&self, generation: u64) -> bool {
        self.store.write().await.mark_clean(generation)
    }

    /// Replaces the store's contents with previously saved entries.
    pub async fn restore(&self, entries: Vec<StoredEntry>) -> usize {
        self.store.write().await.restore(entries)
    }

    // == Accessors ==
    pub async fn is_dirty(&self) -> bool {
        self.store.read().await.is_dirty()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn stats(&self) -> StatsSnapshot {
        self.store.read().await.stats()
    }
}
