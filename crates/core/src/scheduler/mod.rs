//! Batch scheduling for conversion jobs.
//!
//! The [`BatchScheduler`] runs a list of jobs against the codec adapters
//! under a counting admission gate sized by the exclusivity policy: the
//! shared transcoder engine is single-instance and not reentrant-safe, so
//! any batch containing a video/audio job is serialized to concurrency 1.
//! Individual job failures never abort sibling jobs.

mod batch;
mod config;
mod policy;

pub use batch::{BatchOutcome, BatchScheduler, SchedulerStatus};
pub use config::SchedulerConfig;
pub use policy::effective_parallelism;

use thiserror::Error;

/// Batch-level failures. Per-job errors are captured on the job itself;
/// only a defect in the scheduler's own bookkeeping surfaces here.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The admission gate closed while jobs were still waiting on it.
    #[error("admission gate closed unexpectedly")]
    GateClosed,

    /// A conversion worker task panicked.
    #[error("conversion worker panicked: {0}")]
    WorkerPanicked(String),
}
