pub mod codec;
pub mod config;
pub mod export;
pub mod job;
pub mod progress;
pub mod scheduler;
pub mod testing;

pub use codec::{
    CodecAdapter, CodecConfig, ConversionMode, ConversionSettings, ConvertError, ConvertOutput,
    ConvertRequest, EngineHandle, HeifImageCodec, WasmTranscoder,
};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use job::{CancelToken, ConversionJob, JobSource, JobStatus, SharedJob, SourceType};
pub use progress::{JobProgress, ProgressEvent, ProgressSink};
pub use scheduler::{BatchOutcome, BatchScheduler, SchedulerConfig, SchedulerError};
