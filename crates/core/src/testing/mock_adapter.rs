//! Mock codec adapter for scheduler tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::codec::{CodecAdapter, ConvertError, ConvertOutput, ConvertRequest};

/// A recorded conversion request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub job_id: Uuid,
    pub input_file_name: String,
    pub output_file_name: String,
    pub input_len: usize,
}

/// Mock implementation of the `CodecAdapter` trait.
///
/// Provides controllable behavior for scheduler tests:
/// - Record requests for assertions
/// - Inject an error into the next conversion
/// - Simulate conversion latency
/// - Track the maximum number of concurrent conversions
#[derive(Default)]
pub struct MockCodecAdapter {
    name: String,
    requests: RwLock<Vec<RecordedRequest>>,
    next_error: Mutex<Option<ConvertError>>,
    delay_ms: AtomicU64,
    initialize_result: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockCodecAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initialize_result: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Configure the next conversion to fail with the given error.
    pub fn set_next_error(&self, error: ConvertError) {
        *self.next_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    pub fn set_initialize_result(&self, ok: bool) {
        self.initialize_result.store(ok, Ordering::SeqCst);
    }

    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Highest number of conversions ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_error(&self) -> Option<ConvertError> {
        self.next_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

#[async_trait]
impl CodecAdapter for MockCodecAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> bool {
        self.initialize_result.load(Ordering::SeqCst)
    }

    async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput, ConvertError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.requests.write().await.push(RecordedRequest {
            job_id: request.job_id,
            input_file_name: request.input_file_name.clone(),
            output_file_name: request.output_file_name.clone(),
            input_len: request.data.len(),
        });

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        if let Some(err) = self.take_error() {
            return Err(err);
        }

        request.progress.update(10, Some("converting"));
        request.progress.update(70, None);
        request.progress.update(90, None);

        Ok(ConvertOutput {
            file_name: request.output_file_name,
            data: request.data,
        })
    }
}
