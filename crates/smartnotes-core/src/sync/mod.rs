//! Sync engine: routes note operations live or through the offline queue

mod engine;
mod report;

pub use engine::{AutoDrain, SyncEngine};
pub use report::{DrainReport, SkipReason};
