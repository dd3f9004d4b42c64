//! Configuration for the codec module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by the codec adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Ceiling for loading an engine's WASM payload, in seconds.
    #[serde(default = "default_init_timeout")]
    pub init_timeout_secs: u64,

    /// Whether adapters may synthesize a minimal valid output when the
    /// native engine is unavailable or fails.
    #[serde(default = "default_allow_mock")]
    pub allow_mock_fallback: bool,
}

fn default_init_timeout() -> u64 {
    120
}

fn default_allow_mock() -> bool {
    true
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: default_init_timeout(),
            allow_mock_fallback: default_allow_mock(),
        }
    }
}

impl CodecConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    pub fn with_init_timeout(mut self, secs: u64) -> Self {
        self.init_timeout_secs = secs;
        self
    }

    pub fn with_mock_fallback(mut self, allow: bool) -> Self {
        self.allow_mock_fallback = allow;
        self
    }
}
