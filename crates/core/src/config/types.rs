use serde::{Deserialize, Serialize};

use crate::codec::{CodecConfig, ConversionSettings};
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Default conversion settings applied when the caller does not supply
    /// a batch-specific value.
    #[serde(default)]
    pub defaults: ConversionSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sections() {
        let config = Config::default();
        assert_eq!(config.codec.init_timeout_secs, 120);
        assert!(config.codec.allow_mock_fallback);
        assert_eq!(config.scheduler.default_parallelism, 2);
        assert!((config.defaults.jpg_quality - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.scheduler.max_input_bytes,
            config.scheduler.max_input_bytes
        );
    }
}
