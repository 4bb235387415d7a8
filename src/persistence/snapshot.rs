//! Snapshot Module
//!
//! Saves and loads the whole cache as a bincode-encoded map from key to
//! [`SnapshotRecord`]. Saves go to a temporary file that is fsynced and then
//! renamed over the canonical path, so readers never see a partial snapshot.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::cache::{current_timestamp_ms, Cache, StoredEntry, Value};
use crate::error::{CacheError, Result};

// == Snapshot Record ==
/// On-disk form of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub value: Vec<u8>,
    /// Unix seconds, 0 = never expires
    pub expires_at: i64,
}

impl SnapshotRecord {
    /// Converts an in-memory entry, truncating the expiry to whole seconds.
    ///
    /// Truncation can only move an expiry earlier, so an entry that has
    /// expired in memory is never live again after a reload.
    fn from_entry(entry: StoredEntry) -> (String, Self) {
        let expires_at = entry
            .expires_at
            .map(|ms| ms.div_euclid(1000).max(1))
            .unwrap_or(0);
        let record = Self {
            value: entry.value.into_bytes(),
            expires_at,
        };
        (entry.key, record)
    }

    /// Converts back to an entry, or None if it is expired at `now_ms`.
    fn into_entry(self, key: String, now_ms: i64) -> Option<StoredEntry> {
        let expires_at = match self.expires_at {
            0 => None,
            secs => {
                let ms = secs.saturating_mul(1000);
                if ms <= now_ms {
                    return None;
                }
                Some(ms)
            }
        };
        Some(StoredEntry {
            key,
            value: Value::new(self.value),
            expires_at,
        })
    }
}

// == Outcomes ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed since the last snapshot
    Clean,
    /// A snapshot was written; `still_dirty` if writes landed meanwhile
    Saved { entries: usize, still_dirty: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No snapshot file exists
    Missing,
    Loaded { restored: usize, dropped: usize },
}

// == Snapshotter ==
/// Reads and writes the snapshot file at a fixed path.
#[derive(Debug, Clone)]
pub struct Snapshotter {
    path: PathBuf,
}

impl Snapshotter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    // == Save ==
    /// Writes a snapshot if the cache has unsaved changes.
    ///
    /// The cache's dirty flag is cleared only after the rename succeeds and
    /// only if no write happened after the copy was taken.
    pub async fn save(&self, cache: &Cache) -> Result<SaveOutcome> {
        let Some(export) = cache.export_dirty().await else {
            debug!("Snapshot skipped, no changes since last save");
            return Ok(SaveOutcome::Clean);
        };

        let records: BTreeMap<String, SnapshotRecord> = export
            .entries
            .into_iter()
            .map(SnapshotRecord::from_entry)
            .collect();
        let bytes = bincode::serialize(&records)?;

        self.write_atomically(&bytes).await?;

        let cleared = cache.mark_saved(export.generation).await;
        info!(
            path = %self.path.display(),
            entries = records.len(),
            bytes = bytes.len(),
            "Cache snapshot saved to disk"
        );

        Ok(SaveOutcome::Saved {
            entries: records.len(),
            still_dirty: !cleared,
        })
    }

    async fn write_atomically(&self, bytes: &[u8]) -> Result<()> {
        let temp = self.temp_path();

        if let Err(source) = write_synced(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(&temp, source));
        }

        if let Err(source) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(&self.path, source));
        }

        Ok(())
    }

    // == Load ==
    /// Replaces the cache's contents with the snapshot on disk.
    ///
    /// Entries already expired at load time are dropped. A missing file is
    /// not an error; the cache keeps its current (empty) contents.
    pub async fn load(&self, cache: &Cache) -> Result<LoadOutcome> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No snapshot found, starting with an empty cache");
                return Ok(LoadOutcome::Missing);
            }
            Err(source) => return Err(io_error(&self.path, source)),
        };

        let records: BTreeMap<String, SnapshotRecord> = bincode::deserialize(&bytes)?;
        let total = records.len();
        let now = current_timestamp_ms();

        let live: Vec<StoredEntry> = records
            .into_iter()
            .filter_map(|(key, record)| record.into_entry(key, now))
            .collect();
        let dropped = total - live.len();
        let restored = cache.restore(live).await;

        info!(
            path = %self.path.display(),
            restored,
            dropped,
            "Cache state loaded from snapshot"
        );

        Ok(LoadOutcome::Loaded { restored, dropped })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn io_error(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    }
}
