//! Persistence Module
//!
//! Snapshot files and the append-only write log.
//!
//! Failures here are reported to the caller and logged, but never fail a
//! cache operation.

mod snapshot;
mod write_log;

pub use snapshot::{LoadOutcome, SaveOutcome, SnapshotRecord, Snapshotter};
pub use write_log::{WriteLog, WriteLogRecord, WriteOp};
