//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache entries, so keys
//! that are never read again still release their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::Cache;

/// Lifecycle of the sweeper: `Idle -> Sweeping -> Idle` per tick, and
/// `Stopped` once the shutdown token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sweeping,
    Stopped,
}

/// Handle to a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<SchedulerState>,
}

impl SweeperHandle {
    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Waits for the task to exit after the shutdown token was cancelled.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Sweeper task ended abnormally: {}", e);
        }
    }
}

/// Spawns a background task that sweeps expired entries every `interval`.
///
/// A sweep in progress when `shutdown` fires is allowed to finish; no new
/// sweep starts afterwards.
pub fn spawn_sweeper(
    cache: Arc<Cache>,
    interval: Duration,
    shutdown: CancellationToken,
) -> SweeperHandle {
    let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);

    let task = tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweeper");

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            state_tx.send_replace(SchedulerState::Sweeping);
            let removed = cache.sweep_expired().await;
            state_tx.send_replace(SchedulerState::Idle);

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }

        state_tx.send_replace(SchedulerState::Stopped);
        info!("Expiry sweeper stopped");
    });

    SweeperHandle {
        task,
        state: state_rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, EvictionPolicy, Value};

    fn cache() -> Arc<Cache> {
        Arc::new(Cache::new(CacheStore::new(
            100,
            Duration::from_secs(300),
            EvictionPolicy::Lru,
        )))
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_entries() {
        let cache = cache();
        cache
            .set("expire_soon", "value", Some(Duration::from_millis(100)))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(50), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(400)).await;

        // Checked through len so the lazy path on get cannot hide a missed sweep
        assert_eq!(cache.len().await, 0, "Expired entry should have been swept");
        assert_eq!(cache.stats().await.expirations, 1);

        shutdown.cancel();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_sweeper_preserves_valid_entries() {
        let cache = cache();
        cache
            .set("long_lived", "value", Some(Duration::from_secs(3600)))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(cache.clone(), Duration::from_millis(50), shutdown.clone());

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get("long_lived").await, Some(Value::from("value")));

        shutdown.cancel();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(cache(), Duration::from_secs(3600), shutdown.clone());
        assert_eq!(handle.state(), SchedulerState::Idle);

        shutdown.cancel();

        let mut state = handle.state.clone();
        tokio::time::timeout(
            Duration::from_secs(1),
            state.wait_for(|s| *s == SchedulerState::Stopped),
        )
        .await
        .expect("sweeper should stop promptly")
        .unwrap();

        assert_eq!(handle.state(), SchedulerState::Stopped);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_sweep_does_not_mark_dirty() {
        let cache = cache();
        cache
            .set("k", "v", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        let generation = cache.export_dirty().await.unwrap().generation;
        cache.mark_saved(generation).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.sweep_expired().await, 1);
        assert!(!cache.is_dirty().await);
    }
}
