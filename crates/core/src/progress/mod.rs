//! Progress reporting for conversion jobs.
//!
//! Progress flows through an explicit channel of [`ProgressEvent`] messages
//! rather than hidden multicast state. A [`ProgressSink`] is cheaply
//! cloneable and never blocks or fails the emitting task; a [`JobProgress`]
//! wraps a sink for one job and guarantees that the percentages it publishes
//! are non-decreasing, even when the scheduler and a codec adapter interleave
//! their checkpoints.
//!
//! No ordering is guaranteed between events of different jobs.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A coarse progress update for a single job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    /// 0-100.
    pub percent: u8,
    /// Optional human-readable phase message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Sending half of the progress channel.
///
/// Cheaply cloneable and shareable across tasks. Emission is non-blocking;
/// if the channel is full or closed the event is dropped and logged, never
/// failing the conversion that produced it.
#[derive(Clone)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with its receiving half.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.tx.try_send(event) {
            debug!("dropped progress event: {e}");
        }
    }
}

/// Per-job progress handle with a monotonic floor.
///
/// Both the scheduler and the codec adapter emit checkpoints for the same
/// job; the shared floor makes the merged stream non-decreasing regardless
/// of interleaving.
#[derive(Clone)]
pub struct JobProgress {
    job_id: Uuid,
    sink: Option<ProgressSink>,
    floor: Arc<AtomicU8>,
}

impl JobProgress {
    pub fn new(job_id: Uuid, sink: Option<ProgressSink>) -> Self {
        Self {
            job_id,
            sink,
            floor: Arc::new(AtomicU8::new(0)),
        }
    }

    /// A handle that records the floor but emits nothing.
    pub fn disabled(job_id: Uuid) -> Self {
        Self::new(job_id, None)
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Publishes a progress checkpoint, clamped so the reported percentage
    /// never decreases. Returns the effective percentage.
    pub fn update(&self, percent: u8, phase: Option<&str>) -> u8 {
        let requested = percent.min(100);
        let previous = self.floor.fetch_max(requested, Ordering::AcqRel);
        let effective = previous.max(requested);
        if let Some(sink) = &self.sink {
            sink.emit(ProgressEvent {
                job_id: self.job_id,
                percent: effective,
                phase: phase.map(str::to_owned),
            });
        }
        effective
    }

    /// Publishes the terminal zero for a failed job, bypassing the floor.
    pub fn reset(&self) {
        if let Some(sink) = &self.sink {
            sink.emit(ProgressEvent {
                job_id: self.job_id,
                percent: 0,
                phase: None,
            });
        }
    }
}
