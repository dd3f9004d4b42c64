//! The native engine boundary.
//!
//! The real codec engines are multi-megabyte WASM payloads reached through a
//! foreign-function bridge. This module models that boundary as traits plus
//! [`EngineHandle`], an explicitly owned, lazily constructed shared resource:
//! initialization is single-flight and bounded by a timeout, the resolved
//! outcome is cached for the process lifetime, and calls into the shared
//! transcoder are serialized through an explicit lock.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{info, warn};

use super::config::CodecConfig;
use super::error::EngineError;

/// Outcome of an `exec` call into the shared transcoder engine.
///
/// `Aborted` is the engine's known termination signal emitted as part of its
/// normal post-success shutdown; it does not by itself mean the conversion
/// failed. Callers must attempt to read the produced output back and only
/// fail if that readback fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    Completed,
    Aborted,
    Failed(String),
}

impl ExecStatus {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Common surface of every native engine: a slow, fallible load.
#[async_trait]
pub trait NativeEngine: Send + Sync {
    /// Loads the engine payload. Expensive; called at most once per process.
    async fn load(&self) -> Result<(), EngineError>;
}

/// The image codec engine (libheif shape): decodes a still image and
/// re-encodes it as JPEG in one call. Decoder state is per-call, so image
/// conversions may run concurrently.
#[async_trait]
pub trait ImageEngine: NativeEngine {
    async fn decode_to_jpeg(
        &self,
        data: &[u8],
        quality: f64,
        keep_metadata: bool,
    ) -> Result<Vec<u8>, EngineError>;
}

/// The transcoder engine (ffmpeg-wasm shape): a stateful virtual filesystem
/// plus an exec entry point. Not reentrant-safe; callers must hold the
/// [`EngineHandle`] call guard around the whole write/exec/read sequence.
#[async_trait]
pub trait TranscodeEngine: NativeEngine {
    fn is_loaded(&self) -> bool;

    /// Writes an input file into the engine's virtual filesystem.
    async fn write_input(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Runs a conversion. See [`ExecStatus`] for the abort semantics.
    async fn exec(&self, args: &[String]) -> ExecStatus;

    /// Reads a produced file back out of the virtual filesystem.
    async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Removes a file from the virtual filesystem. Best effort.
    async fn remove(&self, name: &str);
}

/// Cached outcome of engine initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineInit {
    /// The native engine loaded and is usable.
    Native,
    /// The native engine is unavailable; synthetic fallback output is used.
    MockOnly,
    /// Neither the native engine nor the fallback path is usable.
    /// Subsequent calls fast-fail without retrying the load.
    Unavailable,
}

impl EngineInit {
    pub fn is_usable(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

/// Process-wide handle to a shared native engine.
///
/// Never a hidden global: construct one per engine family and pass the
/// `Arc<EngineHandle<_>>` to whichever adapter needs it.
pub struct EngineHandle<E: ?Sized> {
    engine: Arc<E>,
    init: OnceCell<EngineInit>,
    call_lock: Mutex<()>,
    init_timeout: Duration,
    allow_mock: bool,
}

impl<E: NativeEngine + ?Sized> EngineHandle<E> {
    pub fn new(engine: Arc<E>, init_timeout: Duration, allow_mock: bool) -> Self {
        Self {
            engine,
            init: OnceCell::new(),
            call_lock: Mutex::new(()),
            init_timeout,
            allow_mock,
        }
    }

    pub fn from_config(engine: Arc<E>, config: &CodecConfig) -> Self {
        Self::new(engine, config.init_timeout(), config.allow_mock_fallback)
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn mock_allowed(&self) -> bool {
        self.allow_mock
    }

    /// Initializes the engine at most once.
    ///
    /// Concurrent callers share a single in-flight load attempt and all
    /// observe the same resolved outcome; later callers get the cached
    /// value without touching the engine again.
    pub async fn initialize(&self) -> EngineInit {
        *self
            .init
            .get_or_init(|| async {
                match tokio::time::timeout(self.init_timeout, self.engine.load()).await {
                    Ok(Ok(())) => {
                        info!("native engine loaded");
                        EngineInit::Native
                    }
                    Ok(Err(e)) => self.degraded(&e.to_string()),
                    Err(_) => self.degraded(&format!(
                        "load timed out after {} seconds",
                        self.init_timeout.as_secs()
                    )),
                }
            })
            .await
    }

    /// Resolved initialization state, if initialization has happened.
    pub fn init_state(&self) -> Option<EngineInit> {
        self.init.get().copied()
    }

    /// Exclusive-call guard: at most one conversion call into the shared
    /// engine is in flight at any moment across the whole process,
    /// independent of any batch-level admission gate.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.call_lock.lock().await
    }

    fn degraded(&self, reason: &str) -> EngineInit {
        if self.allow_mock {
            warn!("native engine unavailable ({reason}); using synthetic fallback output");
            EngineInit::MockOnly
        } else {
            warn!("native engine unavailable ({reason}) and fallback is disabled");
            EngineInit::Unavailable
        }
    }
}
