//! Configuration loading utilities for the OMR pipeline.
//!
//! This module parses a [`TuningConfig`] from TOML or JSON text and validates
//! it before handing it out. Reading the text from disk is left to the
//! caller.

use crate::core::OMRError;
use crate::core::config::{ConfigValidatorExt, TuningConfig};

/// Configuration text format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name.rsplit_once('.')?.1 {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Configuration loader for the OMR pipeline
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates configuration from a string with the given format.
    ///
    /// # Arguments
    ///
    /// * `content` - Configuration content as string
    /// * `format` - Configuration format
    ///
    /// # Returns
    ///
    /// The validated configuration, or an `OMRError::ConfigError` when the
    /// text does not parse or a value is out of range.
    pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<TuningConfig, OMRError> {
        match format {
            ConfigFormat::Toml => Self::load_from_toml(content),
            ConfigFormat::Json => Self::load_from_json(content),
        }
    }

    /// Load configuration from TOML string
    pub fn load_from_toml(content: &str) -> Result<TuningConfig, OMRError> {
        let config: TuningConfig = toml::from_str(content).map_err(|e| OMRError::ConfigError {
            message: format!("Failed to parse TOML config: {e}"),
        })?;
        config.validated()
    }

    /// Load configuration from JSON string
    pub fn load_from_json(content: &str) -> Result<TuningConfig, OMRError> {
        let config: TuningConfig =
            serde_json::from_str(content).map_err(|e| OMRError::ConfigError {
                message: format!("Failed to parse JSON config: {e}"),
            })?;
        config.validated()
    }

    /// Serializes configuration to a string with the given format.
    pub fn save_to_string(config: &TuningConfig, format: ConfigFormat) -> Result<String, OMRError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| OMRError::ConfigError {
                message: format!("Failed to serialize TOML config: {e}"),
            }),
            ConfigFormat::Json => {
                serde_json::to_string_pretty(config).map_err(|e| OMRError::ConfigError {
                    message: format!("Failed to serialize JSON config: {e}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_file_name("tuning.toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_file_name("a.b.json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_file_name("config.yaml"), None);
        assert_eq!(ConfigFormat::from_file_name("config"), None);
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let config = ConfigLoader::load_from_toml(
            r#"
            [thresholding]
            MIN_JUMP = 30.0

            [processing]
            max_parallel_workers = 4

            [ml]
            enabled = true
            fusion_strategy = "ml_fallback"

            [ml.shift_detection]
            enabled = true
            per_block_max_shift_pixels = { Roll = 20.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholding.min_jump, 30.0);
        assert_eq!(config.thresholding.min_gap_two_bubbles, 30.0);
        assert_eq!(config.effective_workers(), 4);
        assert_eq!(config.ml.fusion_strategy, "ml_fallback");
        assert_eq!(config.ml.shift_detection.max_shift_for("Roll"), 20.0);
        assert_eq!(config.ml.shift_detection.max_shift_for("MCQ"), 50.0);
    }

    #[test]
    fn test_load_json_rejects_preview_with_parallel_workers() {
        let err = ConfigLoader::load_from_json(
            r#"{"outputs": {"show_image_level": 2}, "processing": {"max_parallel_workers": 3}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OMRError::ConfigError { .. }));
    }

    #[test]
    fn test_load_rejects_inverted_reduction_bounds() {
        let err = ConfigLoader::load_from_json(
            r#"{"ml": {"shift_detection": {"confidence_reduction_min": 0.6, "confidence_reduction_max": 0.2}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OMRError::ConfigError { .. }));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = ConfigLoader::load_from_string("{not json", ConfigFormat::Json).unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON config"));
    }

    #[test]
    fn test_save_and_reload() {
        let config = TuningConfig::default();
        let text = ConfigLoader::save_to_string(&config, ConfigFormat::Toml).unwrap();
        let reloaded = ConfigLoader::load_from_toml(&text).unwrap();
        assert_eq!(reloaded, config);
    }
}
