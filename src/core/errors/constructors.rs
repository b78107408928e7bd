//! Ergonomic constructors for [`OMRError`].

use super::types::OMRError;

impl OMRError {
    /// Creates an error for input that cannot be processed.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the offending field and value.
    ///
    /// # Arguments
    ///
    /// * `field` - The configuration key.
    /// * `value` - The rejected value.
    /// * `reason` - Why it was rejected.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates a validation error with expected/actual context.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::Validation {
            message: format!(
                "Validation failed in {}: field '{}' expected {}, but got '{}'",
                component, field, expected, actual
            ),
        }
    }

    /// Wraps an error raised inside a pipeline stage.
    pub fn stage_error(stage: impl Into<String>, file: impl Into<String>, source: OMRError) -> Self {
        Self::Stage {
            stage: stage.into(),
            file: file.into(),
            source: Box::new(source),
        }
    }

    /// Wraps a failure reported by an external detector.
    pub fn detector_error(
        detector: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Detector {
            detector: detector.into(),
            source: Box::new(error),
        }
    }

    /// Returns the name of the failing stage, if this error came from one.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::RepositoryError;
    use std::error::Error;

    #[test]
    fn test_config_error_with_context_message() {
        let err = OMRError::config_error_with_context("global_max_shift_pixels", "-3", "must be >= 0");
        let message = err.to_string();
        assert!(message.contains("global_max_shift_pixels"));
        assert!(message.contains("-3"));
    }

    #[test]
    fn test_stage_error_keeps_source_chain() {
        let inner = OMRError::from(RepositoryError::NoActiveFile);
        let err = OMRError::stage_error("DetectionInterpretation", "sheet_01.png", inner);
        assert_eq!(err.stage_name(), Some("DetectionInterpretation"));
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("no active file"));
    }

    #[test]
    fn test_field_not_found_display() {
        let err = RepositoryError::FieldNotFound {
            file: "a.png".to_string(),
            field_id: "q7".to_string(),
        };
        assert_eq!(err.to_string(), "field 'q7' not found in file 'a.png'");
    }
}
