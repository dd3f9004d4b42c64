//! Core job data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::cancel::CancelToken;
use super::JobError;

/// A job shared between the submitting caller and the scheduler.
pub type SharedJob = Arc<RwLock<ConversionJob>>;

/// Container kind of a submitted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Heic,
    Mov,
    Mp4,
    Avi,
    Mkv,
    Wmv,
    Flv,
    Webm,
    Wav,
    Aac,
    M4a,
    Flac,
    Wma,
    Mp3,
    Unknown,
}

impl SourceType {
    /// Maps a file extension (without the dot, any case) to a source type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "heic" | "heif" => Self::Heic,
            "mov" => Self::Mov,
            "mp4" | "m4v" => Self::Mp4,
            "avi" => Self::Avi,
            "mkv" => Self::Mkv,
            "wmv" => Self::Wmv,
            "flv" => Self::Flv,
            "webm" => Self::Webm,
            "wav" => Self::Wav,
            "aac" => Self::Aac,
            "m4a" => Self::M4a,
            "flac" => Self::Flac,
            "wma" => Self::Wma,
            "mp3" => Self::Mp3,
            _ => Self::Unknown,
        }
    }

    /// Maps the extension of a file name to a source type.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Self::Unknown,
        }
    }

    /// Detects the source type from the file name, falling back to container
    /// magic bytes when the extension is missing or unrecognized.
    pub fn detect(file_name: &str, bytes: &[u8]) -> Self {
        match Self::from_file_name(file_name) {
            Self::Unknown => Self::sniff(bytes),
            known => known,
        }
    }

    /// Sniffs well-known container signatures.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return match &bytes[8..12] {
                b"heic" | b"heix" | b"hevc" | b"mif1" | b"msf1" => Self::Heic,
                b"qt  " => Self::Mov,
                b"M4A " => Self::M4a,
                _ => Self::Mp4,
            };
        }
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") {
            return match &bytes[8..12] {
                b"WAVE" => Self::Wav,
                b"AVI " => Self::Avi,
                _ => Self::Unknown,
            };
        }
        if bytes.starts_with(b"fLaC") {
            return Self::Flac;
        }
        if bytes.starts_with(b"ID3") {
            return Self::Mp3;
        }
        if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0 {
            // Bare MPEG audio frame sync.
            return Self::Mp3;
        }
        if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            // EBML header (Matroska family).
            return Self::Mkv;
        }
        if bytes.starts_with(b"FLV") {
            return Self::Flv;
        }
        if bytes.starts_with(&[0x30, 0x26, 0xB2, 0x75]) {
            // ASF container.
            return Self::Wmv;
        }
        Self::Unknown
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Heic)
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            Self::Mov | Self::Mp4 | Self::Avi | Self::Mkv | Self::Wmv | Self::Flv | Self::Webm
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self,
            Self::Wav | Self::Aac | Self::M4a | Self::Flac | Self::Wma | Self::Mp3
        )
    }

    /// Whether conversion of this type goes through the shared transcoder
    /// engine (anything beyond the image codec).
    pub fn requires_transcoder(&self) -> bool {
        self.is_video() || self.is_audio()
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Canonical file extension for this type.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Heic => "heic",
            Self::Mov => "mov",
            Self::Mp4 => "mp4",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Wmv => "wmv",
            Self::Flv => "flv",
            Self::Webm => "webm",
            Self::Wav => "wav",
            Self::Aac => "aac",
            Self::M4a => "m4a",
            Self::Flac => "flac",
            Self::Wma => "wma",
            Self::Mp3 => "mp3",
            Self::Unknown => "bin",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            other => f.write_str(other.extension()),
        }
    }
}

/// Current status of a conversion job.
///
/// State machine flow:
/// ```text
/// Pending -> Processing -> { Completed | Error }
/// Pending -> { Error | Cancelled }
/// Processing -> Cancelled
/// ```
///
/// `Completed`, `Error` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns the status as a string (for filtering and display).
    pub fn state_type(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.state_type())
    }
}

/// Where a job's input bytes come from.
///
/// `Memory` is the browser drag/drop path (bytes already in hand); `File`
/// is read lazily by the scheduler so oversized inputs can be rejected
/// before allocation.
#[derive(Debug, Clone)]
pub enum JobSource {
    Memory(Vec<u8>),
    File(PathBuf),
}

impl JobSource {
    /// Known size in bytes, if available without touching the filesystem.
    pub fn len_hint(&self) -> Option<u64> {
        match self {
            Self::Memory(bytes) => Some(bytes.len() as u64),
            Self::File(_) => None,
        }
    }
}

/// One file's conversion lifecycle state.
#[derive(Debug)]
pub struct ConversionJob {
    /// Unique id, assigned at submission, never reused.
    pub id: Uuid,
    pub file_name: String,
    pub size_bytes: u64,
    pub source_type: SourceType,
    /// Input bytes, owned by the job until conversion starts.
    pub source: JobSource,
    pub status: JobStatus,
    /// 0-100, non-decreasing while `Processing`, reset to 0 on `Error`.
    pub progress_percent: u8,
    /// Present iff `status == Error`.
    pub error_message: Option<String>,
    /// Present iff `status == Completed`.
    pub converted_bytes: Option<Vec<u8>>,
    pub converted_file_name: Option<String>,
    pub cancel: CancelToken,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionJob {
    /// Creates a pending job. The source type is detected from the file name,
    /// with a magic-byte fallback for in-memory sources.
    pub fn new(file_name: impl Into<String>, source: JobSource) -> Self {
        let file_name = file_name.into();
        let source_type = match &source {
            JobSource::Memory(bytes) => SourceType::detect(&file_name, bytes),
            JobSource::File(_) => SourceType::from_file_name(&file_name),
        };
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            size_bytes: source.len_hint().unwrap_or(0),
            file_name,
            source_type,
            source,
            status: JobStatus::Pending,
            progress_percent: 0,
            error_message: None,
            converted_bytes: None,
            converted_file_name: None,
            cancel: CancelToken::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a pending job from in-memory bytes.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, JobSource::Memory(bytes))
    }

    /// Creates a pending job reading from a file path.
    pub fn from_path(file_name: impl Into<String>, path: PathBuf) -> Self {
        Self::new(file_name, JobSource::File(path))
    }

    /// Overrides the detected source type (e.g. when the caller sniffed the
    /// container itself).
    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn into_shared(self) -> SharedJob {
        Arc::new(RwLock::new(self))
    }

    /// Output file name for this job: image -> `.jpg`, video -> `.mp4`
    /// (or `.mp3` when extracting audio), audio -> `.mp3`.
    pub fn output_file_name(&self, extract_audio_only: bool) -> String {
        if self.source_type.is_image() {
            change_extension(&self.file_name, "jpg")
        } else if self.source_type.is_video() {
            if extract_audio_only {
                change_extension(&self.file_name, "mp3")
            } else {
                change_extension(&self.file_name, "mp4")
            }
        } else if self.source_type.is_audio() {
            change_extension(&self.file_name, "mp3")
        } else {
            self.file_name.clone()
        }
    }

    /// Takes the input bytes out of the job, leaving an empty memory source.
    pub fn take_source(&mut self) -> JobSource {
        std::mem::replace(&mut self.source, JobSource::Memory(Vec::new()))
    }

    /// Transitions `Pending -> Processing`.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Pending, JobStatus::Processing)?;
        self.progress_percent = 0;
        Ok(())
    }

    /// Transitions `Processing -> Completed`, storing the converted output.
    pub fn complete(
        &mut self,
        converted_file_name: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<(), JobError> {
        self.transition(JobStatus::Processing, JobStatus::Completed)?;
        self.converted_file_name = Some(converted_file_name.into());
        self.converted_bytes = Some(data);
        self.error_message = None;
        self.progress_percent = 100;
        Ok(())
    }

    /// Transitions to `Error` with a human-readable message. Reachable from
    /// `Pending` (pre-flight rejection) or `Processing`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: JobStatus::Error,
            });
        }
        self.status = JobStatus::Error;
        self.error_message = Some(message.into());
        self.converted_bytes = None;
        self.converted_file_name = None;
        self.progress_percent = 0;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transitions to `Cancelled`. No partial output is retained.
    pub fn mark_cancelled(&mut self) -> Result<(), JobError> {
        if self.status.is_terminal() {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to: JobStatus::Cancelled,
            });
        }
        self.status = JobStatus::Cancelled;
        self.converted_bytes = None;
        self.converted_file_name = None;
        self.error_message = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records scheduler-side progress. Never decreases while processing.
    pub fn record_progress(&mut self, percent: u8) {
        if self.status == JobStatus::Processing {
            self.progress_percent = self.progress_percent.max(percent.min(100));
            self.updated_at = Utc::now();
        }
    }

    /// Snapshot for presentation-layer polling.
    pub fn view(&self) -> JobView {
        JobView {
            id: self.id,
            file_name: self.file_name.clone(),
            size_bytes: self.size_bytes,
            source_type: self.source_type,
            status: self.status,
            progress_percent: self.progress_percent,
            error_message: self.error_message.clone(),
            converted_file_name: self.converted_file_name.clone(),
            updated_at: self.updated_at,
        }
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<(), JobError> {
        if self.status != from {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Serializable snapshot of a job, without the byte buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub id: Uuid,
    pub file_name: String,
    pub size_bytes: u64,
    pub source_type: SourceType,
    pub status: JobStatus,
    pub progress_percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted_file_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn change_extension(file_name: &str, ext: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{ext}"),
        _ => format!("{file_name}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_from_extension() {
        assert_eq!(SourceType::from_extension("HEIC"), SourceType::Heic);
        assert_eq!(SourceType::from_extension("mov"), SourceType::Mov);
        assert_eq!(SourceType::from_extension("flac"), SourceType::Flac);
        assert_eq!(SourceType::from_extension("xyz"), SourceType::Unknown);
    }

    #[test]
    fn test_source_type_from_file_name() {
        assert_eq!(SourceType::from_file_name("photo.heic"), SourceType::Heic);
        assert_eq!(SourceType::from_file_name("clip.MOV"), SourceType::Mov);
        assert_eq!(SourceType::from_file_name("noext"), SourceType::Unknown);
        assert_eq!(SourceType::from_file_name(".heic"), SourceType::Unknown);
    }

    #[test]
    fn test_sniff_ftyp_brands() {
        let mut heic = vec![0x00, 0x00, 0x00, 0x18];
        heic.extend_from_slice(b"ftypheic");
        heic.extend_from_slice(&[0u8; 8]);
        assert_eq!(SourceType::sniff(&heic), SourceType::Heic);

        let mut mov = vec![0x00, 0x00, 0x00, 0x14];
        mov.extend_from_slice(b"ftypqt  ");
        mov.extend_from_slice(&[0u8; 8]);
        assert_eq!(SourceType::sniff(&mov), SourceType::Mov);

        let mut mp4 = vec![0x00, 0x00, 0x00, 0x20];
        mp4.extend_from_slice(b"ftypisom");
        mp4.extend_from_slice(&[0u8; 8]);
        assert_eq!(SourceType::sniff(&mp4), SourceType::Mp4);
    }

    #[test]
    fn test_sniff_audio_signatures() {
        assert_eq!(SourceType::sniff(b"ID3\x03\x00rest"), SourceType::Mp3);
        assert_eq!(SourceType::sniff(&[0xFF, 0xFB, 0x90, 0x00]), SourceType::Mp3);
        assert_eq!(SourceType::sniff(b"fLaC\x00\x00\x00\x22"), SourceType::Flac);
        assert_eq!(SourceType::sniff(b"RIFF\x24\x00\x00\x00WAVEfmt "), SourceType::Wav);
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(SourceType::sniff(b"plain text"), SourceType::Unknown);
        assert_eq!(SourceType::sniff(&[]), SourceType::Unknown);
    }

    #[test]
    fn test_detect_prefers_extension() {
        let mut mp4 = vec![0x00, 0x00, 0x00, 0x20];
        mp4.extend_from_slice(b"ftypisom");
        assert_eq!(SourceType::detect("clip.mov", &mp4), SourceType::Mov);
        assert_eq!(SourceType::detect("clip", &mp4), SourceType::Mp4);
    }

    #[test]
    fn test_type_classification() {
        assert!(SourceType::Heic.is_image());
        assert!(!SourceType::Heic.requires_transcoder());
        assert!(SourceType::Mov.is_video());
        assert!(SourceType::Mov.requires_transcoder());
        assert!(SourceType::Flac.is_audio());
        assert!(SourceType::Flac.requires_transcoder());
        assert!(!SourceType::Unknown.is_supported());
        assert!(!SourceType::Unknown.requires_transcoder());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Pending.can_cancel());
        assert!(!JobStatus::Completed.can_cancel());
    }

    #[test]
    fn test_output_file_name_mapping() {
        let image = ConversionJob::from_bytes("photo.heic", vec![]);
        assert_eq!(image.output_file_name(false), "photo.jpg");

        let video = ConversionJob::from_bytes("clip.mov", vec![]);
        assert_eq!(video.output_file_name(false), "clip.mp4");
        assert_eq!(video.output_file_name(true), "clip.mp3");

        let audio = ConversionJob::from_bytes("song.flac", vec![]);
        assert_eq!(audio.output_file_name(false), "song.mp3");

        let unknown = ConversionJob::from_bytes("data.xyz", vec![]);
        assert_eq!(unknown.output_file_name(false), "data.xyz");
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = ConversionJob::from_bytes("photo.heic", vec![1, 2, 3]);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.size_bytes, 3);

        job.start().unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        job.complete("photo.jpg", vec![0xFF, 0xD8]).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert!(job.converted_bytes.is_some());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_fail_resets_progress() {
        let mut job = ConversionJob::from_bytes("clip.mov", vec![0; 16]);
        job.start().unwrap();
        job.record_progress(30);
        assert_eq!(job.progress_percent, 30);

        job.fail("engine exploded").unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress_percent, 0);
        assert!(job.converted_bytes.is_none());
        assert_eq!(job.error_message.as_deref(), Some("engine exploded"));
    }

    #[test]
    fn test_fail_from_pending() {
        let mut job = ConversionJob::from_bytes("data.xyz", vec![]);
        job.fail("unsupported").unwrap();
        assert_eq!(job.status, JobStatus::Error);
    }

    #[test]
    fn test_no_transitions_out_of_terminal_states() {
        let mut job = ConversionJob::from_bytes("photo.heic", vec![]);
        job.start().unwrap();
        job.complete("photo.jpg", vec![1]).unwrap();

        assert!(job.start().is_err());
        assert!(job.fail("nope").is_err());
        assert!(job.mark_cancelled().is_err());
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn test_cancel_from_pending_and_processing() {
        let mut pending = ConversionJob::from_bytes("a.mov", vec![]);
        pending.mark_cancelled().unwrap();
        assert_eq!(pending.status, JobStatus::Cancelled);

        let mut processing = ConversionJob::from_bytes("b.mov", vec![]);
        processing.start().unwrap();
        processing.mark_cancelled().unwrap();
        assert_eq!(processing.status, JobStatus::Cancelled);
        assert!(processing.converted_bytes.is_none());
    }

    #[test]
    fn test_record_progress_is_monotonic() {
        let mut job = ConversionJob::from_bytes("a.heic", vec![]);
        job.start().unwrap();
        job.record_progress(30);
        job.record_progress(10);
        assert_eq!(job.progress_percent, 30);
        job.record_progress(90);
        assert_eq!(job.progress_percent, 90);
    }

    #[test]
    fn test_take_source_leaves_empty_memory() {
        let mut job = ConversionJob::from_bytes("a.heic", vec![1, 2, 3]);
        let source = job.take_source();
        assert!(matches!(source, JobSource::Memory(ref b) if b.len() == 3));
        assert!(matches!(job.source, JobSource::Memory(ref b) if b.is_empty()));
    }

    #[test]
    fn test_view_serialization() {
        let job = ConversionJob::from_bytes("photo.heic", vec![1, 2]);
        let view = job.view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"source_type\":\"heic\""));
        // Absent options are skipped.
        assert!(!json.contains("error_message"));

        let parsed: JobView = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, job.id);
        assert_eq!(parsed.progress_percent, 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ConversionJob::from_bytes("a.heic", vec![]);
        let b = ConversionJob::from_bytes("b.heic", vec![]);
        assert_ne!(a.id, b.id);
    }
}
