//! Conversion job types and lifecycle.
//!
//! A [`ConversionJob`] tracks one file from submission to a terminal state.
//! Jobs are mutated only by the scheduler; callers observe them through
//! shared handles ([`SharedJob`]) and the progress channel.

mod cancel;
mod types;

pub use cancel::CancelToken;
pub use types::{
    ConversionJob, JobSource, JobStatus, JobView, SharedJob, SourceType,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}
