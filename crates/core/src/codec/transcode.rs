//! Shared transcoder adapter for video and audio families.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::{EngineHandle, ExecStatus, TranscodeEngine};
use super::error::ConvertError;
use super::mock::{mock_mp3, mock_mp4};
use super::traits::CodecAdapter;
use super::types::{ConversionMode, ConvertOptions, ConvertOutput, ConvertRequest};
use crate::job::SourceType;

/// Target of a transcode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TranscodeTarget {
    Mp4,
    Mp3,
}

impl TranscodeTarget {
    fn for_request(source_type: SourceType, options: &ConvertOptions) -> Self {
        if source_type.is_audio() || options.extract_audio_only {
            Self::Mp3
        } else {
            Self::Mp4
        }
    }

    fn output_name(&self) -> &'static str {
        match self {
            Self::Mp4 => "output.mp4",
            Self::Mp3 => "output.mp3",
        }
    }
}

/// Converts video and audio containers through the shared transcoder engine.
///
/// The engine is a single loaded instance with process-global virtual
/// filesystem state; every write/exec/read sequence runs under the handle's
/// exclusive call guard so at most one conversion is in flight at any
/// moment, regardless of how the batch admission gate is sized.
pub struct WasmTranscoder<E: ?Sized> {
    handle: Arc<EngineHandle<E>>,
}

impl<E: TranscodeEngine + ?Sized> WasmTranscoder<E> {
    pub fn new(handle: Arc<EngineHandle<E>>) -> Self {
        Self { handle }
    }

    /// Builds the argument set for one conversion.
    fn build_args(
        source_type: SourceType,
        options: &ConvertOptions,
        input_name: &str,
        output_name: &str,
        target: TranscodeTarget,
    ) -> Vec<String> {
        let mut args = vec!["-i".to_string(), input_name.to_string()];

        match target {
            TranscodeTarget::Mp3 => {
                if source_type.is_video() {
                    args.push("-vn".to_string());
                }
                args.extend(["-c:a", "libmp3lame", "-q:a", "2"].map(str::to_string));
            }
            TranscodeTarget::Mp4 => match options.mode {
                ConversionMode::Auto | ConversionMode::Fast => {
                    args.extend(["-c", "copy", "-movflags", "+faststart"].map(str::to_string));
                }
                ConversionMode::Quality => {
                    args.extend(
                        [
                            "-c:v",
                            "libx264",
                            "-c:a",
                            "aac",
                            "-preset",
                            "veryfast",
                            "-crf",
                            "23",
                            "-movflags",
                            "+faststart",
                        ]
                        .map(str::to_string),
                    );
                }
            },
        }

        args.push("-y".to_string());
        args.push(output_name.to_string());
        args
    }

    /// Runs one conversion through the native engine. The caller holds the
    /// exclusive call guard.
    async fn run_native(
        &self,
        request: &ConvertRequest,
        source_type: SourceType,
        target: TranscodeTarget,
    ) -> Result<Vec<u8>, ConvertError> {
        let engine = self.handle.engine();
        let input_name = format!("input.{}", source_type.extension());
        let output_name = target.output_name();
        let args = Self::build_args(
            source_type,
            &request.options,
            &input_name,
            output_name,
            target,
        );

        engine
            .write_input(&input_name, &request.data)
            .await
            .map_err(|e| ConvertError::conversion_failed(e.to_string()))?;

        debug!(job = %request.job_id, "transcoding: {}", args.join(" "));
        let status = engine.exec(&args).await;
        match status {
            ExecStatus::Completed => {}
            ExecStatus::Aborted => {
                // Known post-success termination signal; the output is
                // usually intact. Only the readback below decides failure.
                warn!(job = %request.job_id, "engine reported abort; attempting output readback");
            }
            ExecStatus::Failed(reason) => {
                engine.remove(&input_name).await;
                return Err(ConvertError::conversion_failed(reason));
            }
        }

        let result = engine.read_output(output_name).await;
        engine.remove(&input_name).await;
        engine.remove(output_name).await;

        result.map_err(|e| {
            ConvertError::conversion_failed(format!("conversion result unavailable: {e}"))
        })
    }

    fn synthesize(&self, request: &ConvertRequest, target: TranscodeTarget) -> Vec<u8> {
        debug!(file = %request.input_file_name, "synthesizing fallback output");
        match target {
            TranscodeTarget::Mp4 => mock_mp4(request.data.len()),
            TranscodeTarget::Mp3 => mock_mp3(request.data.len()),
        }
    }
}

#[async_trait]
impl<E: TranscodeEngine + ?Sized> CodecAdapter for WasmTranscoder<E> {
    fn name(&self) -> &str {
        "wasm-transcoder"
    }

    async fn initialize(&self) -> bool {
        self.handle.initialize().await.is_usable()
    }

    async fn convert(&self, request: ConvertRequest) -> Result<ConvertOutput, ConvertError> {
        if request.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        request.progress.update(10, Some("converting"));

        let source_type = request.source_type;
        let target = TranscodeTarget::for_request(source_type, &request.options);

        let init = self.handle.initialize().await;
        if !init.is_usable() {
            return Err(ConvertError::EngineInitializationFailed {
                family: "transcoder".to_string(),
            });
        }

        let data = if init.is_native() {
            let _guard = self.handle.acquire().await;
            if request.cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }
            match self.run_native(&request, source_type, target).await {
                Ok(bytes) => bytes,
                Err(e) if self.handle.mock_allowed() => {
                    warn!(
                        file = %request.input_file_name,
                        "transcode failed ({e}); using synthetic fallback output"
                    );
                    self.synthesize(&request, target)
                }
                Err(e) => return Err(e),
            }
        } else {
            self.synthesize(&request, target)
        };

        if request.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        request.progress.update(70, Some("generating output"));
        request.progress.update(90, Some("finalizing"));

        Ok(ConvertOutput {
            file_name: request.output_file_name,
            data,
        })
    }
}
