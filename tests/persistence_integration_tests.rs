//! Integration Tests for Persistence
//!
//! Snapshot round trips and the write log through the public API.

use std::time::Duration;

use mini_cache::cache::CacheStore;
use mini_cache::persistence::LoadOutcome;
use mini_cache::{Cache, EvictionPolicy, Snapshotter, Value, WriteLog};
use tempfile::tempdir;

fn cache(policy: EvictionPolicy) -> Cache {
    Cache::new(CacheStore::new(100, Duration::from_secs(300), policy))
}

#[tokio::test]
async fn test_restart_restores_live_entries_only() {
    let dir = tempdir().unwrap();
    let snapshotter = Snapshotter::new(dir.path().join("cache_snap.bin"));

    let before = cache(EvictionPolicy::Lru);
    before.set("durable", "yes", None).await.unwrap();
    before.set("forever", "always", Some(Duration::ZERO)).await.unwrap();
    before
        .set("fleeting", "soon", Some(Duration::from_secs(1)))
        .await
        .unwrap();
    snapshotter.save(&before).await.unwrap();

    // Snapshot expiry has whole-second resolution
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let after = cache(EvictionPolicy::Lru);
    let outcome = snapshotter.load(&after).await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            restored: 2,
            dropped: 1
        }
    );
    assert_eq!(after.get("durable").await, Some(Value::from("yes")));
    assert_eq!(after.get("forever").await, Some(Value::from("always")));
    assert_eq!(after.get("fleeting").await, None);
}

#[tokio::test]
async fn test_write_log_records_every_successful_set() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("cache_aof.log");
    let cache = cache(EvictionPolicy::Fifo).with_write_log(WriteLog::new(&log_path));

    cache.set("A", "1", None).await.unwrap();
    cache.set("b", "2", None).await.unwrap();
    cache.delete("a").await;
    cache.set("B", "3", None).await.unwrap();

    let log = tokio::fs::read_to_string(&log_path).await.unwrap();
    assert_eq!(log, "SET a 1\nSET b 2\nSET b 3\n");
}

#[tokio::test]
async fn test_write_log_is_not_replayed_on_load() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("cache_aof.log");
    let snapshotter = Snapshotter::new(dir.path().join("cache_snap.bin"));

    let writer = cache(EvictionPolicy::Lru).with_write_log(WriteLog::new(&log_path));
    writer.set("logged", "only", None).await.unwrap();

    let reader = cache(EvictionPolicy::Lru);
    assert_eq!(snapshotter.load(&reader).await.unwrap(), LoadOutcome::Missing);
    assert!(reader.is_empty().await);
}
