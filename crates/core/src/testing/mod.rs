//! Test doubles for the codec and scheduler boundaries.
//!
//! These mocks provide controllable behavior for tests: scripted failures,
//! simulated delays, call recording and concurrency high-water marks.
//!
//! # Example
//!
//! ```rust,ignore
//! use clipmill_core::testing::MockTranscodeEngine;
//!
//! let engine = Arc::new(MockTranscodeEngine::new());
//! engine.set_exec_status(ExecStatus::Aborted);
//!
//! // Drive an adapter against the scripted engine...
//! assert_eq!(engine.max_in_flight(), 1);
//! ```

mod mock_adapter;
mod mock_engines;

pub use mock_adapter::MockCodecAdapter;
pub use mock_engines::{MockImageEngine, MockTranscodeEngine};
