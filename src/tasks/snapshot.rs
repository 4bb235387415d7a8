//! Snapshot Task
//!
//! Background task that periodically flushes dirty cache state to disk.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::Cache;
use crate::persistence::{SaveOutcome, Snapshotter};

/// Spawns a background task that saves a snapshot every `interval`.
///
/// Failures are logged and retried on the next tick, since the cache stays
/// dirty until a save succeeds. The final flush at shutdown is the caller's
/// job.
pub fn spawn_snapshot_task(
    cache: Arc<Cache>,
    snapshotter: Snapshotter,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            path = %snapshotter.path().display(),
            interval_secs = interval.as_secs(),
            "Starting snapshot task"
        );

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match snapshotter.save(&cache).await {
                Ok(SaveOutcome::Saved {
                    still_dirty: true, ..
                }) => debug!("Cache changed during snapshot, will save again next tick"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Snapshot failed, will retry next tick"),
            }
        }

        info!("Snapshot task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, EvictionPolicy, Value};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_snapshot_task_flushes_dirty_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache_snap.bin");
        let cache = Arc::new(Cache::new(CacheStore::new(
            10,
            Duration::ZERO,
            EvictionPolicy::Lru,
        )));
        cache.set("key", "value", None).await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_snapshot_task(
            cache.clone(),
            Snapshotter::new(&path),
            Duration::from_millis(50),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(path.exists());
        assert!(!cache.is_dirty().await);

        shutdown.cancel();
        handle.await.unwrap();

        let restored = Cache::new(CacheStore::new(10, Duration::ZERO, EvictionPolicy::Lru));
        Snapshotter::new(&path).load(&restored).await.unwrap();
        assert_eq!(restored.get("key").await, Some(Value::from("value")));
    }

    #[tokio::test]
    async fn test_snapshot_task_exits_on_cancel() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(Cache::new(CacheStore::new(
            10,
            Duration::ZERO,
            EvictionPolicy::Lru,
        )));

        let shutdown = CancellationToken::new();
        let handle = spawn_snapshot_task(
            cache,
            Snapshotter::new(dir.path().join("snap.bin")),
            Duration::from_secs(3600),
            shutdown.clone(),
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("snapshot task should stop promptly")
            .unwrap();
    }
}
