//! Types for the codec module.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{CancelToken, SourceType};
use crate::progress::JobProgress;

/// Conversion mode selecting the speed/quality trade-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionMode {
    /// Stream copy where possible, re-encode otherwise.
    #[default]
    Auto,
    /// Always stream copy (fast, no re-encode).
    Fast,
    /// Always re-encode for consistent output quality.
    Quality,
}

/// Batch-wide conversion settings, immutable for the batch's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Target JPEG quality, 0.0-1.0.
    #[serde(default = "default_jpg_quality")]
    pub jpg_quality: f64,

    /// Whether to carry source metadata (EXIF etc.) into the output.
    #[serde(default = "default_preserve_metadata")]
    pub preserve_metadata: bool,

    #[serde(default)]
    pub mode: ConversionMode,

    /// Requested parallelism (advisory; see the exclusivity policy).
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Extract the audio track only from video sources (output `.mp3`).
    #[serde(default)]
    pub extract_audio_only: bool,
}

fn default_jpg_quality() -> f64 {
    0.9
}

fn default_preserve_metadata() -> bool {
    true
}

fn default_parallelism() -> usize {
    2
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            jpg_quality: default_jpg_quality(),
            preserve_metadata: default_preserve_metadata(),
            mode: ConversionMode::default(),
            parallelism: default_parallelism(),
            extract_audio_only: false,
        }
    }
}

impl ConversionSettings {
    /// Per-operation options handed to a codec adapter.
    pub fn to_options(&self) -> ConvertOptions {
        ConvertOptions {
            jpg_quality: self.jpg_quality,
            keep_metadata: self.preserve_metadata,
            mode: self.mode,
            extract_audio_only: self.extract_audio_only,
        }
    }
}

/// Options for a single conversion operation.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub jpg_quality: f64,
    pub keep_metadata: bool,
    pub mode: ConversionMode,
    pub extract_audio_only: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConversionSettings::default().to_options()
    }
}

/// A single conversion request handed to a codec adapter.
pub struct ConvertRequest {
    pub job_id: Uuid,
    /// Original file name of the input.
    pub input_file_name: String,
    /// File name the output should carry.
    pub output_file_name: String,
    pub source_type: SourceType,
    pub data: Vec<u8>,
    pub options: ConvertOptions,
    pub cancel: CancelToken,
    pub progress: JobProgress,
}

impl ConvertRequest {
    /// A minimal request for direct adapter use (tests, one-off calls). The
    /// source type is derived from the input file name.
    pub fn new(
        input_file_name: impl Into<String>,
        output_file_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let job_id = Uuid::new_v4();
        let input_file_name = input_file_name.into();
        Self {
            job_id,
            source_type: SourceType::from_file_name(&input_file_name),
            input_file_name,
            output_file_name: output_file_name.into(),
            data,
            options: ConvertOptions::default(),
            cancel: CancelToken::new(),
            progress: JobProgress::disabled(job_id),
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: JobProgress) -> Self {
        self.progress = progress;
        self
    }
}

/// Successful conversion output: a named byte blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOutput {
    pub file_name: String,
    pub data: Vec<u8>,
}
