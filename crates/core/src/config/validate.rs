use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - JPEG quality stays within 0.0-1.0
/// - Input size ceiling is non-zero
/// - Parallelism is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.defaults.jpg_quality) {
        return Err(ConfigError::ValidationError(format!(
            "defaults.jpg_quality must be between 0.0 and 1.0, got {}",
            config.defaults.jpg_quality
        )));
    }

    if config.scheduler.max_input_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.max_input_bytes cannot be 0".to_string(),
        ));
    }

    if config.scheduler.default_parallelism == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.default_parallelism cannot be 0".to_string(),
        ));
    }

    if config.codec.init_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "codec.init_timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
