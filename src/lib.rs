//! Mini Cache - A lightweight in-memory cache server
//!
//! Redis-like key-value cache over a newline-delimited text protocol, with
//! TTL expiration, capacity-driven eviction (LRU, FIFO, LFU), periodic
//! snapshots and an append-only write log.

pub mod cache;
pub mod config;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod tasks;

pub use cache::{Cache, EvictionPolicy, SetOutcome, Value};
pub use config::Config;
pub use error::{CacheError, Result};
pub use persistence::{Snapshotter, WriteLog};
pub use server::CacheServer;
pub use tasks::{spawn_snapshot_task, spawn_sweeper};
