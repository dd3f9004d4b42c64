//! Runs a small batch through the scheduler with the mock engines, printing
//! progress events and the batch outcome.
//!
//! ```sh
//! cargo run --example batch_convert
//! ```

use std::sync::Arc;

use clipmill_core::codec::{
    CodecConfig, ConversionSettings, EngineHandle, HeifImageCodec, WasmTranscoder,
};
use clipmill_core::job::ConversionJob;
use clipmill_core::progress::ProgressSink;
use clipmill_core::scheduler::{BatchScheduler, SchedulerConfig};
use clipmill_core::testing::{MockImageEngine, MockTranscodeEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let codec_config = CodecConfig::default();
    let image_handle = Arc::new(EngineHandle::from_config(
        Arc::new(MockImageEngine::new()),
        &codec_config,
    ));
    let transcode_handle = Arc::new(EngineHandle::from_config(
        Arc::new(MockTranscodeEngine::new()),
        &codec_config,
    ));

    let scheduler = BatchScheduler::new(
        SchedulerConfig::default(),
        Arc::new(HeifImageCodec::new(image_handle)),
        Arc::new(WasmTranscoder::new(transcode_handle)),
    );

    let jobs = vec![
        ConversionJob::from_bytes("vacation.heic", vec![0u8; 2048]).into_shared(),
        ConversionJob::from_bytes("clip.mov", vec![0u8; 4096]).into_shared(),
        ConversionJob::from_bytes("song.flac", vec![0u8; 1024]).into_shared(),
    ];

    let (sink, mut rx) = ProgressSink::channel(256);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!(
                "  [{}] {:>3}% {}",
                event.job_id,
                event.percent,
                event.phase.as_deref().unwrap_or("")
            );
        }
    });

    let outcome = scheduler
        .run(&jobs, &ConversionSettings::default(), Some(sink))
        .await?;
    printer.await?;

    println!(
        "batch finished: {}/{} completed in {} ms",
        outcome.completed, outcome.total, outcome.duration_ms
    );
    for job in &jobs {
        let job = job.read().await;
        println!(
            "  {} -> {} ({})",
            job.file_name,
            job.converted_file_name.as_deref().unwrap_or("-"),
            job.status
        );
    }
    Ok(())
}
