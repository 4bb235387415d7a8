//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweeper: removes expired cache entries at configured intervals
//! - Snapshot: flushes dirty cache state to the snapshot file
//!
//! Both stop at their next wait point once the shared shutdown token fires.

mod snapshot;
mod sweeper;

pub use snapshot::spawn_snapshot_task;
pub use sweeper::{spawn_sweeper, SchedulerState, SweeperHandle};
