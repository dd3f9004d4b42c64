//! Configuration for the scheduler module.

use serde::{Deserialize, Serialize};

/// Configuration for the batch scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum accepted input size in bytes. Oversized inputs fail their
    /// job with a clear error instead of being read into memory.
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,

    /// Parallelism used when a batch's settings request 0 (auto).
    #[serde(default = "default_parallelism")]
    pub default_parallelism: usize,

    /// Capacity of the progress channel created by convenience callers.
    #[serde(default = "default_progress_capacity")]
    pub progress_channel_capacity: usize,
}

fn default_max_input_bytes() -> u64 {
    2 * 1024 * 1024 * 1024 // 2 GiB
}

fn default_parallelism() -> usize {
    2
}

fn default_progress_capacity() -> usize {
    256
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            default_parallelism: default_parallelism(),
            progress_channel_capacity: default_progress_capacity(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_max_input_bytes(mut self, max: u64) -> Self {
        self.max_input_bytes = max;
        self
    }

    pub fn with_default_parallelism(mut self, parallelism: usize) -> Self {
        self.default_parallelism = parallelism;
        self
    }
}
