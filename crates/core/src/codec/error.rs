//! Error types for the codec module.

use thiserror::Error;

use crate::job::SourceType;

/// Errors surfaced by codec adapters and the scheduler's single-job boundary.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// No codec is registered for the detected source kind.
    #[error("unsupported source type: {source_type}")]
    UnsupportedType { source_type: SourceType },

    /// The native engine failed to load and the fallback path is unusable.
    /// Fatal for the family for the remainder of the process lifetime.
    #[error("codec engine initialization failed for {family}")]
    EngineInitializationFailed { family: String },

    /// The adapter ran but produced no usable output.
    #[error("conversion failed: {reason}")]
    ConversionFailed { reason: String },

    /// Cooperative cancellation was observed.
    #[error("conversion cancelled")]
    Cancelled,

    /// Input exceeds the accepted byte-size ceiling.
    #[error("input of {size} bytes exceeds the {max} byte limit")]
    OversizedInput { size: u64, max: u64 },
}

impl ConvertError {
    pub fn conversion_failed(reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors from the native engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine payload could not be loaded.
    #[error("engine load failed: {reason}")]
    LoadFailed { reason: String },

    /// Loading exceeded the configured ceiling.
    #[error("engine load timed out after {timeout_secs} seconds")]
    LoadTimeout { timeout_secs: u64 },

    /// A call was made before the engine was loaded.
    #[error("engine is not loaded")]
    NotLoaded,

    /// Image decode failed.
    #[error("decode failed: {reason}")]
    DecodeFailed { reason: String },

    /// Writing into the engine's virtual filesystem failed.
    #[error("virtual filesystem write failed: {reason}")]
    WriteFailed { reason: String },

    /// The converted output could not be read back out of the engine.
    #[error("converted output could not be read back: {reason}")]
    OutputUnreadable { reason: String },
}

impl EngineError {
    pub fn load_failed(reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            reason: reason.into(),
        }
    }

    pub fn decode_failed(reason: impl Into<String>) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::UnsupportedType {
            source_type: SourceType::Unknown,
        };
        assert_eq!(err.to_string(), "unsupported source type: unknown");

        let err = ConvertError::OversizedInput {
            size: 3_000_000_000,
            max: 2_147_483_648,
        };
        assert!(err.to_string().contains("3000000000"));

        assert!(ConvertError::Cancelled.is_cancelled());
        assert!(!ConvertError::conversion_failed("x").is_cancelled());
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::LoadTimeout { timeout_secs: 120 };
        assert_eq!(err.to_string(), "engine load timed out after 120 seconds");
    }
}
