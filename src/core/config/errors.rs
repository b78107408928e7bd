//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that two settings contradict each other.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// Error indicating that a resource limit has been exceeded.
    #[error("resource limit exceeded: {message}")]
    ResourceLimitExceeded { message: String },
}

/// A trait for validating configuration parameters.
///
/// Every configuration section of the engine implements this so that a bad
/// run configuration is rejected once, at construction, instead of surfacing
/// halfway through a directory.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a confidence value is within `0.0..=1.0`.
    fn validate_confidence(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        self.validate_f64_range(value, 0.0, 1.0, field_name)
    }

    /// Validates an intensity value is within `0.0..=255.0`.
    fn validate_intensity(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        self.validate_f64_range(value, 0.0, 255.0, field_name)
    }

    /// Validates a float value is within a specified inclusive range.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to validate.
    /// * `min` - The minimum allowed value (inclusive).
    /// * `max` - The maximum allowed value (inclusive).
    /// * `field_name` - The name of the field being validated.
    fn validate_f64_range(
        &self,
        value: f64,
        min: f64,
        max: f64,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if !value.is_finite() || value < min || value > max {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a float value is finite and not negative.
    fn validate_non_negative(&self, value: f64, field_name: &str) -> Result<(), ConfigError> {
        if !value.is_finite() || value < 0.0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be >= 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }

    /// Validates a worker count.
    fn validate_thread_count(&self, thread_count: usize) -> Result<(), ConfigError> {
        const MAX_REASONABLE_THREADS: usize = 256;

        if thread_count == 0 {
            Err(ConfigError::InvalidConfig {
                message: "Thread count must be greater than 0".to_string(),
            })
        } else if thread_count > MAX_REASONABLE_THREADS {
            Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "Thread count {} exceeds reasonable maximum of {}",
                    thread_count, MAX_REASONABLE_THREADS
                ),
            })
        } else {
            Ok(())
        }
    }
}

/// Extension trait wrapping validation failures into [`OMRError`](crate::core::OMRError).
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates configuration and converts any failure into `OMRError::ConfigError`.
    fn validated(self) -> Result<Self, crate::core::OMRError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}
