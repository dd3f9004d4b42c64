//! The batch scheduler.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::codec::{
    CodecAdapter, ConversionSettings, ConvertError, ConvertOutput, ConvertRequest,
};
use crate::job::{CancelToken, JobSource, JobStatus, SharedJob, SourceType};
use crate::progress::{JobProgress, ProgressSink};

use super::config::SchedulerConfig;
use super::policy::effective_parallelism;
use super::SchedulerError;

/// Tracks counters across batches.
#[derive(Default)]
struct BatchStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
    total_cancelled: AtomicU64,
}

/// Snapshot of the scheduler's pool counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub total_processed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
}

/// Runs batches of conversion jobs against the codec adapters.
///
/// Jobs are admitted through a counting gate sized by the exclusivity
/// policy; each job's failure is isolated to that job. The scheduler is the
/// only mutator of job state, and a job is never touched by two worker
/// tasks at once.
pub struct BatchScheduler {
    config: SchedulerConfig,
    image_codec: Arc<dyn CodecAdapter>,
    transcoder: Arc<dyn CodecAdapter>,
    stats: Arc<BatchStats>,
}

impl BatchScheduler {
    pub fn new(
        config: SchedulerConfig,
        image_codec: Arc<dyn CodecAdapter>,
        transcoder: Arc<dyn CodecAdapter>,
    ) -> Self {
        Self {
            config,
            image_codec,
            transcoder,
            stats: Arc::new(BatchStats::default()),
        }
    }

    /// Returns the current pool counters.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            queued_jobs: self.stats.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
            total_cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
        }
    }

    /// Runs every job to a terminal state and returns the aggregate outcome.
    ///
    /// Completes only once all jobs are `Completed`, `Error` or `Cancelled`.
    /// Per-job errors are recorded on the jobs; only a scheduler defect
    /// (panicked worker, broken gate) fails the batch itself.
    pub async fn run(
        &self,
        jobs: &[SharedJob],
        settings: &ConversionSettings,
        progress: Option<ProgressSink>,
    ) -> Result<BatchOutcome, SchedulerError> {
        let start = Instant::now();

        let mut types = Vec::with_capacity(jobs.len());
        for job in jobs {
            types.push(job.read().await.source_type);
        }
        let requested = if settings.parallelism == 0 {
            self.config.default_parallelism
        } else {
            settings.parallelism
        };
        let parallelism = effective_parallelism(&types, requested);
        info!(
            jobs = jobs.len(),
            parallelism,
            "starting conversion batch"
        );

        let gate = Arc::new(Semaphore::new(parallelism));
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let worker = JobWorker {
                job: Arc::clone(job),
                settings: settings.clone(),
                image_codec: Arc::clone(&self.image_codec),
                transcoder: Arc::clone(&self.transcoder),
                gate: Arc::clone(&gate),
                stats: Arc::clone(&self.stats),
                sink: progress.clone(),
                max_input_bytes: self.config.max_input_bytes,
            };
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in futures::future::join_all(handles).await {
            match handle {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(join_err) => {
                    error!("conversion worker panicked: {join_err}");
                    return Err(SchedulerError::WorkerPanicked(join_err.to_string()));
                }
            }
        }

        let mut outcome = BatchOutcome {
            total: jobs.len(),
            completed: 0,
            failed: 0,
            cancelled: 0,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        for job in jobs {
            match job.read().await.status {
                JobStatus::Completed => outcome.completed += 1,
                JobStatus::Error => outcome.failed += 1,
                JobStatus::Cancelled => outcome.cancelled += 1,
                status => warn!("job left batch in non-terminal state: {status}"),
            }
        }
        info!(
            completed = outcome.completed,
            failed = outcome.failed,
            cancelled = outcome.cancelled,
            "conversion batch finished"
        );
        Ok(outcome)
    }
}

/// Per-job worker state; one task per submitted job.
struct JobWorker {
    job: SharedJob,
    settings: ConversionSettings,
    image_codec: Arc<dyn CodecAdapter>,
    transcoder: Arc<dyn CodecAdapter>,
    gate: Arc<Semaphore>,
    stats: Arc<BatchStats>,
    sink: Option<ProgressSink>,
    max_input_bytes: u64,
}

impl JobWorker {
    async fn run(self) -> Result<(), SchedulerError> {
        let (job_id, source_type, cancel) = {
            let job = self.job.read().await;
            (job.id, job.source_type, job.cancel.clone())
        };
        let progress = JobProgress::new(job_id, self.sink.clone());

        // Unsupported types are rejected before they ever touch the
        // admission gate.
        let adapter = match self.select_adapter(source_type) {
            Some(adapter) => adapter,
            None => {
                self.fail_job(&ConvertError::UnsupportedType { source_type }, &progress)
                    .await;
                return Ok(());
            }
        };

        if cancel.is_cancelled() {
            self.cancel_job().await;
            return Ok(());
        }

        self.stats.queued.fetch_add(1, Ordering::Relaxed);
        let permit = self.gate.clone().acquire_owned().await;
        self.stats.queued.fetch_sub(1, Ordering::Relaxed);
        // Held for the remainder of the worker; released on every exit path.
        let _permit = permit.map_err(|_| SchedulerError::GateClosed)?;

        if cancel.is_cancelled() {
            self.cancel_job().await;
            return Ok(());
        }

        self.stats.active.fetch_add(1, Ordering::Relaxed);
        let result = self.convert(adapter, &cancel, &progress).await;
        self.stats.active.fetch_sub(1, Ordering::Relaxed);

        match result {
            Ok(output) => self.complete_job(output, &progress).await,
            Err(ConvertError::Cancelled) => self.cancel_job().await,
            Err(e) => self.fail_job(&e, &progress).await,
        }
        Ok(())
    }

    fn select_adapter(&self, source_type: SourceType) -> Option<Arc<dyn CodecAdapter>> {
        if source_type.is_image() {
            Some(Arc::clone(&self.image_codec))
        } else if source_type.requires_transcoder() {
            Some(Arc::clone(&self.transcoder))
        } else {
            None
        }
    }

    /// Drives one job through load and conversion.
    async fn convert(
        &self,
        adapter: Arc<dyn CodecAdapter>,
        cancel: &CancelToken,
        progress: &JobProgress,
    ) -> Result<ConvertOutput, ConvertError> {
        let (job_id, input_file_name, output_file_name, source_type, source) = {
            let mut job = self.job.write().await;
            job.start()
                .map_err(|e| ConvertError::conversion_failed(e.to_string()))?;
            (
                job.id,
                job.file_name.clone(),
                job.output_file_name(self.settings.extract_audio_only),
                job.source_type,
                job.take_source(),
            )
        };
        progress.update(0, Some("starting"));

        let data = self.load_source(source).await?;
        {
            let mut job = self.job.write().await;
            job.size_bytes = data.len() as u64;
            job.record_progress(30);
        }
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        progress.update(30, Some("loaded"));

        debug!(job = %job_id, adapter = adapter.name(), "dispatching conversion");
        let request = ConvertRequest {
            job_id,
            input_file_name,
            output_file_name,
            source_type,
            data,
            options: self.settings.to_options(),
            cancel: cancel.clone(),
            progress: progress.clone(),
        };
        let output = adapter.convert(request).await?;

        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        self.job.write().await.record_progress(90);
        progress.update(90, Some("converted"));
        Ok(output)
    }

    /// Reads the job's input, rejecting oversized inputs before allocation.
    async fn load_source(&self, source: JobSource) -> Result<Vec<u8>, ConvertError> {
        match source {
            JobSource::Memory(bytes) => {
                let size = bytes.len() as u64;
                if size > self.max_input_bytes {
                    return Err(ConvertError::OversizedInput {
                        size,
                        max: self.max_input_bytes,
                    });
                }
                Ok(bytes)
            }
            JobSource::File(path) => {
                let meta = tokio::fs::metadata(&path).await.map_err(|e| {
                    ConvertError::conversion_failed(format!("failed to stat input file: {e}"))
                })?;
                if meta.len() > self.max_input_bytes {
                    return Err(ConvertError::OversizedInput {
                        size: meta.len(),
                        max: self.max_input_bytes,
                    });
                }
                tokio::fs::read(&path).await.map_err(|e| {
                    ConvertError::conversion_failed(format!("failed to read input file: {e}"))
                })
            }
        }
    }

    async fn complete_job(&self, output: ConvertOutput, progress: &JobProgress) {
        let mut job = self.job.write().await;
        match job.complete(output.file_name, output.data) {
            Ok(()) => {
                progress.update(100, Some("done"));
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => error!(job = %job.id, "failed to record completion: {e}"),
        }
    }

    async fn fail_job(&self, error: &ConvertError, progress: &JobProgress) {
        let mut job = self.job.write().await;
        warn!(job = %job.id, file = %job.file_name, "conversion failed: {error}");
        match job.fail(error.to_string()) {
            Ok(()) => {
                progress.reset();
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => error!(job = %job.id, "failed to record error: {e}"),
        }
    }

    /// Marks the job cancelled. No further progress events are emitted.
    async fn cancel_job(&self) {
        let mut job = self.job.write().await;
        match job.mark_cancelled() {
            Ok(()) => {
                debug!(job = %job.id, "job cancelled");
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => error!(job = %job.id, "failed to record cancellation: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ConversionMode;
    use crate::job::ConversionJob;
    use crate::testing::MockCodecAdapter;
    use std::time::Duration;

    fn scheduler_with(
        config: SchedulerConfig,
    ) -> (BatchScheduler, Arc<MockCodecAdapter>, Arc<MockCodecAdapter>) {
        let image = Arc::new(MockCodecAdapter::new("mock-image"));
        let transcoder = Arc::new(MockCodecAdapter::new("mock-transcoder"));
        let scheduler = BatchScheduler::new(
            config,
            Arc::clone(&image) as Arc<dyn CodecAdapter>,
            Arc::clone(&transcoder) as Arc<dyn CodecAdapter>,
        );
        (scheduler, image, transcoder)
    }

    fn scheduler() -> (BatchScheduler, Arc<MockCodecAdapter>, Arc<MockCodecAdapter>) {
        scheduler_with(SchedulerConfig::default())
    }

    fn settings() -> ConversionSettings {
        ConversionSettings {
            parallelism: 4,
            ..ConversionSettings::default()
        }
    }

    #[tokio::test]
    async fn test_image_batch_completes() {
        let (scheduler, image, transcoder) = scheduler();
        let jobs = vec![
            ConversionJob::from_bytes("a.heic", vec![1; 8]).into_shared(),
            ConversionJob::from_bytes("b.heic", vec![2; 8]).into_shared(),
        ];

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.failed, 0);
        assert_eq!(image.request_count().await, 2);
        assert_eq!(transcoder.request_count().await, 0);

        let job = jobs[0].read().await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.converted_file_name.as_deref(), Some("a.jpg"));
        assert!(job.converted_bytes.is_some());
        assert!(job.error_message.is_none());
    }

    #[tokio::test]
    async fn test_video_routes_to_transcoder_with_extension_mapping() {
        let (scheduler, _image, transcoder) = scheduler();
        let jobs = vec![ConversionJob::from_bytes("clip.mov", vec![0; 8]).into_shared()];

        scheduler.run(&jobs, &settings(), None).await.unwrap();
        let requests = transcoder.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].output_file_name, "clip.mp4");

        let audio_settings = ConversionSettings {
            extract_audio_only: true,
            ..settings()
        };
        let jobs = vec![ConversionJob::from_bytes("clip.mov", vec![0; 8]).into_shared()];
        scheduler.run(&jobs, &audio_settings, None).await.unwrap();
        let requests = transcoder.recorded_requests().await;
        assert_eq!(requests[1].output_file_name, "clip.mp3");
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_without_touching_adapters() {
        let (scheduler, image, transcoder) = scheduler();
        let jobs = vec![ConversionJob::from_bytes("data.xyz", vec![0; 8]).into_shared()];

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.failed, 1);
        assert_eq!(image.request_count().await, 0);
        assert_eq!(transcoder.request_count().await, 0);

        let job = jobs[0].read().await;
        assert_eq!(job.status, JobStatus::Error);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("unsupported source type"));
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let (scheduler, _image, _transcoder) = scheduler();
        let jobs = vec![
            ConversionJob::from_bytes("a.heic", vec![1; 8]).into_shared(),
            ConversionJob::from_bytes("bad.xyz", vec![2; 8]).into_shared(),
            ConversionJob::from_bytes("c.heic", vec![3; 8]).into_shared(),
        ];

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.completed, 2);
        assert_eq!(outcome.failed, 1);

        assert_eq!(jobs[0].read().await.status, JobStatus::Completed);
        assert_eq!(jobs[1].read().await.status, JobStatus::Error);
        assert_eq!(jobs[2].read().await.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_mixed_batch_serializes_to_one() {
        let (scheduler, image, transcoder) = scheduler();
        image.set_delay(Duration::from_millis(10));
        transcoder.set_delay(Duration::from_millis(10));

        let jobs: Vec<_> = ["a.heic", "b.mov", "c.heic", "d.heic"]
            .iter()
            .map(|name| ConversionJob::from_bytes(*name, vec![0; 8]).into_shared())
            .collect();

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.completed, 4);
        // With a transcoder job present the whole batch runs at concurrency
        // 1, so neither adapter ever sees overlapping conversions.
        assert_eq!(image.max_in_flight(), 1);
        assert_eq!(transcoder.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_oversized_memory_input_fails_cleanly() {
        let (scheduler, _image, _transcoder) =
            scheduler_with(SchedulerConfig::default().with_max_input_bytes(4));
        let jobs = vec![ConversionJob::from_bytes("big.heic", vec![0; 64]).into_shared()];

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.failed, 1);
        let job = jobs[0].read().await;
        assert!(job.error_message.as_deref().unwrap().contains("exceeds"));
        assert_eq!(job.progress_percent, 0);
    }

    #[tokio::test]
    async fn test_oversized_file_input_rejected_before_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.heic");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let (scheduler, image, _transcoder) =
            scheduler_with(SchedulerConfig::default().with_max_input_bytes(16));
        let jobs = vec![ConversionJob::from_path("big.heic", path).into_shared()];

        let outcome = scheduler.run(&jobs, &settings(), None).await.unwrap();
        assert_eq!(outcome.failed, 1);
        assert_eq!(image.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_file_source_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.heic");
        std::fs::write(&path, vec![7u8; 24]).unwrap();

        let (scheduler, image, _transcoder) = scheduler();
        let jobs = vec![ConversionJob::from_path("photo.heic", path).into_shared()];

        scheduler.run(&jobs, &settings(), None).await.unwrap();
        let requests = image.recorded_requests().await;
        assert_eq!(requests[0].input_len, 24);
        assert_eq!(jobs[0].read().await.size_bytes, 24);
    }

    #[tokio::test]
    async fn test_cancellation_before_start() {
        let (scheduler, image, _transcoder) = scheduler();
        let job = ConversionJob::from_bytes("a.heic", vec![0; 8]).into_shared();
        job.read().await.cancel.cancel();

        let outcome = scheduler
            .run(&[Arc::clone(&job)], &settings(), None)
            .await
            .unwrap();
        assert_eq!(outcome.cancelled, 1);
        assert_eq!(job.read().await.status, JobStatus::Cancelled);
        assert_eq!(image.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_processing() {
        let (scheduler, image, _transcoder) = scheduler();
        image.set_delay(Duration::from_millis(50));
        let job = ConversionJob::from_bytes("a.heic", vec![0; 8]).into_shared();
        let cancel = job.read().await.cancel.clone();

        let handle = {
            let job = Arc::clone(&job);
            let settings = settings();
            tokio::spawn(async move { scheduler.run(&[job], &settings, None).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.cancelled, 1);
        let job = job.read().await;
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.converted_bytes.is_none());
    }

    #[tokio::test]
    async fn test_batch_outcome_counts_and_stats() {
        let (scheduler, _image, _transcoder) = scheduler();
        let jobs = vec![
            ConversionJob::from_bytes("a.heic", vec![1; 8]).into_shared(),
            ConversionJob::from_bytes("bad.xyz", vec![2; 8]).into_shared(),
        ];

        scheduler.run(&jobs, &settings(), None).await.unwrap();
        let status = scheduler.status();
        assert_eq!(status.total_processed, 1);
        assert_eq!(status.total_failed, 1);
        assert_eq!(status.active_jobs, 0);
        assert_eq!(status.queued_jobs, 0);
    }

    #[tokio::test]
    async fn test_progress_events_are_monotonic_and_terminal() {
        let (scheduler, _image, _transcoder) = scheduler();
        let (sink, mut rx) = ProgressSink::channel(64);
        let jobs = vec![ConversionJob::from_bytes("a.heic", vec![1; 8]).into_shared()];

        scheduler.run(&jobs, &settings(), Some(sink)).await.unwrap();
        drop(scheduler);

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            percents.push(event.percent);
        }
        assert!(!percents.is_empty());
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*percents.last().unwrap(), 100);
    }

    #[tokio::test]
    async fn test_failed_job_progress_resets_to_zero() {
        let (scheduler, image, _transcoder) = scheduler();
        image.set_next_error(ConvertError::conversion_failed("boom"));
        let (sink, mut rx) = ProgressSink::channel(64);
        let jobs = vec![ConversionJob::from_bytes("a.heic", vec![1; 8]).into_shared()];

        scheduler.run(&jobs, &settings(), Some(sink)).await.unwrap();

        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            percents.push(event.percent);
        }
        assert_eq!(*percents.last().unwrap(), 0);
        assert_eq!(jobs[0].read().await.progress_percent, 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (scheduler, _image, _transcoder) = scheduler();
        let outcome = scheduler.run(&[], &settings(), None).await.unwrap();
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.completed, 0);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BatchOutcome {
            total: 3,
            completed: 2,
            failed: 1,
            cancelled: 0,
            duration_ms: 1200,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"completed\":2"));
    }

    #[test]
    fn test_conversion_mode_passthrough() {
        let settings = ConversionSettings {
            mode: ConversionMode::Quality,
            ..ConversionSettings::default()
        };
        assert_eq!(settings.to_options().mode, ConversionMode::Quality);
    }
}
