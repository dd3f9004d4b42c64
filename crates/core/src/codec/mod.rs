//! Codec adapters for converting media files in-process.
//!
//! This module provides the [`CodecAdapter`] trait plus one adapter per
//! engine family: [`HeifImageCodec`] for stills and [`WasmTranscoder`] for
//! video/audio containers. The engines themselves are external WASM payloads
//! reached through the traits in [`engine`]; when an engine is unavailable
//! or fails, adapters degrade to deterministic synthetic output ([`mock`])
//! rather than failing the pipeline.
//!
//! # Example
//!
//! ```ignore
//! use clipmill_core::codec::{
//!     CodecConfig, ConvertRequest, EngineHandle, HeifImageCodec,
//! };
//!
//! let handle = Arc::new(EngineHandle::from_config(engine, &CodecConfig::default()));
//! let codec = HeifImageCodec::new(handle);
//!
//! codec.initialize().await;
//! let output = codec
//!     .convert(ConvertRequest::new("photo.heic", "photo.jpg", bytes))
//!     .await?;
//! println!("{} ({} bytes)", output.file_name, output.data.len());
//! ```

mod config;
mod engine;
mod error;
mod image;
pub mod mock;
mod traits;
mod transcode;
mod types;

pub use config::CodecConfig;
pub use engine::{
    EngineHandle, EngineInit, ExecStatus, ImageEngine, NativeEngine, TranscodeEngine,
};
pub use error::{ConvertError, EngineError};
pub use image::HeifImageCodec;
pub use traits::CodecAdapter;
pub use transcode::WasmTranscoder;
pub use types::{
    ConversionMode, ConversionSettings, ConvertOptions, ConvertOutput, ConvertRequest,
};
