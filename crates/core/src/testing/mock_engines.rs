//! Mock native engines.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Barrier, RwLock};

use crate::codec::mock::JPEG_MAGIC;
use crate::codec::{EngineError, ExecStatus, ImageEngine, NativeEngine, TranscodeEngine};

/// Mock implementation of the image engine.
///
/// - Script load/decode failures
/// - Simulate decode latency
/// - Count load attempts (for single-flight assertions)
/// - Track the maximum number of concurrent decodes
/// - Optionally rendezvous concurrent decodes on a barrier
#[derive(Default)]
pub struct MockImageEngine {
    load_attempts: AtomicUsize,
    fail_load: AtomicBool,
    fail_decode: AtomicBool,
    decode_delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    decode_barrier: RwLock<Option<Arc<Barrier>>>,
    decoded_sizes: RwLock<Vec<usize>>,
}

impl MockImageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_decode(&self, fail: bool) {
        self.fail_decode.store(fail, Ordering::SeqCst);
    }

    pub fn set_decode_delay(&self, delay: Duration) {
        self.decode_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes every decode wait until `parties` decodes are in flight at once.
    pub async fn set_decode_barrier(&self, parties: usize) {
        *self.decode_barrier.write().await = Some(Arc::new(Barrier::new(parties)));
    }

    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub async fn decoded_sizes(&self) -> Vec<usize> {
        self.decoded_sizes.read().await.clone()
    }

    /// The bytes a successful native decode produces for the given input.
    pub fn native_output(&self, input: &[u8]) -> Vec<u8> {
        let mut out = JPEG_MAGIC.to_vec();
        out.extend_from_slice(b"native");
        out.extend_from_slice(input);
        out
    }
}

#[async_trait]
impl NativeEngine for MockImageEngine {
    async fn load(&self) -> Result<(), EngineError> {
        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            Err(EngineError::load_failed("mock image engine load failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ImageEngine for MockImageEngine {
    async fn decode_to_jpeg(
        &self,
        data: &[u8],
        _quality: f64,
        _keep_metadata: bool,
    ) -> Result<Vec<u8>, EngineError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let barrier = self.decode_barrier.read().await.clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        let delay = self.decode_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(EngineError::decode_failed("mock decode failure"));
        }
        self.decoded_sizes.write().await.push(data.len());
        Ok(self.native_output(data))
    }
}

/// Mock implementation of the shared transcoder engine.
///
/// Keeps an actual virtual filesystem map so write/exec/read sequencing is
/// exercised for real, and records the concurrency high-water mark of `exec`
/// calls for exclusivity assertions.
pub struct MockTranscodeEngine {
    load_attempts: AtomicUsize,
    fail_load: AtomicBool,
    loaded: AtomicBool,
    exec_status: Mutex<ExecStatus>,
    fail_readback: AtomicBool,
    exec_delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    files: RwLock<HashMap<String, Vec<u8>>>,
    exec_calls: RwLock<Vec<Vec<String>>>,
}

impl Default for MockTranscodeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscodeEngine {
    pub fn new() -> Self {
        Self {
            load_attempts: AtomicUsize::new(0),
            fail_load: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            exec_status: Mutex::new(ExecStatus::Completed),
            fail_readback: AtomicBool::new(false),
            exec_delay_ms: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            files: RwLock::new(HashMap::new()),
            exec_calls: RwLock::new(Vec::new()),
        }
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_exec_status(&self, status: ExecStatus) {
        *self.exec_status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn set_fail_readback(&self, fail: bool) {
        self.fail_readback.store(fail, Ordering::SeqCst);
    }

    pub fn set_exec_delay(&self, delay: Duration) {
        self.exec_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of `exec` calls ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub async fn exec_calls(&self) -> Vec<Vec<String>> {
        self.exec_calls.read().await.clone()
    }

    /// Current virtual filesystem contents.
    pub async fn files(&self) -> HashMap<String, Vec<u8>> {
        self.files.read().await.clone()
    }

    /// The bytes a successful native transcode produces for the given input.
    pub fn native_output(&self, input: &[u8]) -> Vec<u8> {
        let mut out = b"ENGINE-OUTPUT".to_vec();
        out.extend_from_slice(input);
        out
    }
}

#[async_trait]
impl NativeEngine for MockTranscodeEngine {
    async fn load(&self) -> Result<(), EngineError> {
        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            Err(EngineError::load_failed("mock transcoder load failure"))
        } else {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[async_trait]
impl TranscodeEngine for MockTranscodeEngine {
    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn write_input(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.files
            .write()
            .await
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> ExecStatus {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.exec_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.exec_calls.write().await.push(args.to_vec());

        let status = self
            .exec_status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if !status.is_fatal() {
            // Produce the output file named by the last argument.
            let input = args
                .iter()
                .position(|a| a == "-i")
                .and_then(|i| args.get(i + 1));
            let input_bytes = match input {
                Some(name) => self.files.read().await.get(name).cloned().unwrap_or_default(),
                None => Vec::new(),
            };
            if let Some(output_name) = args.last() {
                self.files
                    .write()
                    .await
                    .insert(output_name.clone(), self.native_output(&input_bytes));
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        status
    }

    async fn read_output(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        if self.fail_readback.load(Ordering::SeqCst) {
            return Err(EngineError::OutputUnreadable {
                reason: "mock readback failure".to_string(),
            });
        }
        self.files
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(EngineError::OutputUnreadable {
                reason: format!("no such file: {name}"),
            })
    }

    async fn remove(&self, name: &str) {
        self.files.write().await.remove(name);
    }
}
