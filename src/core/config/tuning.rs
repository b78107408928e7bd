//! Run-wide tuning configuration.
//!
//! Mirrors the sections of the tuning file an OMR run is started with:
//! thresholding constants, output/preview settings, worker pool size and the
//! optional ML/shift-detection block. Every field has a serde default so a
//! partial document deserializes into a complete configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::errors::{ConfigError, ConfigValidator};
use crate::core::constants::*;

/// Numeric constants driving the threshold calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ThresholdingConfig {
    /// Minimum jump between sorted intensities to count as a mark/no-mark gap.
    pub min_jump: f64,
    /// Delta between jumps for two-jump detection.
    pub jump_delta: f64,
    /// Minimum gap between the two values of a two-item field.
    pub min_gap_two_bubbles: f64,
    /// Extra jump a field needs before its local threshold beats the page fallback.
    pub min_jump_surplus_for_global_fallback: f64,
    /// Extra jump for high confidence despite local/global disparity.
    pub confident_jump_surplus_for_disparity: f64,
    /// Safety margin around the global threshold.
    pub global_threshold_margin: f64,
    /// Page-level default threshold when no gap can be found.
    pub global_page_threshold: f64,
    /// Default outlier-deviation threshold over per-field std deviations.
    pub global_page_threshold_std: f64,
    /// Minimum jump between sorted per-field std deviations.
    pub min_jump_std: f64,
    /// Delta between std-deviation jumps.
    pub jump_delta_std: f64,
}

impl Default for ThresholdingConfig {
    fn default() -> Self {
        Self {
            min_jump: DEFAULT_MIN_JUMP,
            jump_delta: DEFAULT_JUMP_DELTA,
            min_gap_two_bubbles: DEFAULT_MIN_GAP_TWO_BUBBLES,
            min_jump_surplus_for_global_fallback: DEFAULT_MIN_JUMP_SURPLUS_FOR_GLOBAL_FALLBACK,
            confident_jump_surplus_for_disparity: DEFAULT_CONFIDENT_JUMP_SURPLUS_FOR_DISPARITY,
            global_threshold_margin: DEFAULT_GLOBAL_THRESHOLD_MARGIN,
            global_page_threshold: DEFAULT_GLOBAL_PAGE_THRESHOLD,
            global_page_threshold_std: DEFAULT_GLOBAL_PAGE_THRESHOLD_STD,
            min_jump_std: DEFAULT_MIN_JUMP_STD,
            jump_delta_std: DEFAULT_JUMP_DELTA_STD,
        }
    }
}

impl ConfigValidator for ThresholdingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_intensity(self.min_jump, "MIN_JUMP")?;
        self.validate_intensity(self.jump_delta, "JUMP_DELTA")?;
        self.validate_intensity(self.min_gap_two_bubbles, "MIN_GAP_TWO_BUBBLES")?;
        self.validate_intensity(
            self.min_jump_surplus_for_global_fallback,
            "MIN_JUMP_SURPLUS_FOR_GLOBAL_FALLBACK",
        )?;
        self.validate_intensity(
            self.confident_jump_surplus_for_disparity,
            "CONFIDENT_JUMP_SURPLUS_FOR_DISPARITY",
        )?;
        self.validate_intensity(self.global_threshold_margin, "GLOBAL_THRESHOLD_MARGIN")?;
        self.validate_intensity(self.global_page_threshold, "GLOBAL_PAGE_THRESHOLD")?;
        self.validate_intensity(self.global_page_threshold_std, "GLOBAL_PAGE_THRESHOLD_STD")?;
        self.validate_intensity(self.min_jump_std, "MIN_JUMP_STD")?;
        self.validate_intensity(self.jump_delta_std, "JUMP_DELTA_STD")?;

        if self.min_jump <= 0.0 {
            return Err(ConfigError::InvalidConfig {
                message: "MIN_JUMP must be greater than 0".to_string(),
            });
        }
        if self.min_jump_std <= 0.0 {
            return Err(ConfigError::InvalidConfig {
                message: "MIN_JUMP_STD must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Output and preview settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsConfig {
    /// Interactive preview level; anything above 0 opens image windows.
    pub show_image_level: u8,
    /// Log per-field confidence breakdowns.
    pub show_confidence_metrics: bool,
}

impl OutputsConfig {
    /// Whether interactive image preview is on.
    pub fn preview_enabled(&self) -> bool {
        self.show_image_level > 0
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of files processed in parallel (1 = sequential).
    pub max_parallel_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_parallel_workers: 1,
        }
    }
}

/// Bounds for ML-proposed block shifts and the confidence penalty applied
/// when shifted and unshifted readings disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftDetectionConfig {
    /// Run the shift validation stage.
    pub enabled: bool,
    /// Largest accepted shift magnitude, in pixels.
    pub global_max_shift_pixels: f64,
    /// Per-block overrides of `global_max_shift_pixels`.
    pub per_block_max_shift_pixels: HashMap<String, f64>,
    /// Reduction applied at zero severity.
    pub confidence_reduction_min: f64,
    /// Reduction applied at full severity.
    pub confidence_reduction_max: f64,
    /// Bubble mismatches in a file at which review is requested.
    pub bubble_mismatch_threshold: usize,
    /// Field mismatches in a file at which review is requested.
    pub field_mismatch_threshold: usize,
}

impl Default for ShiftDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            global_max_shift_pixels: DEFAULT_GLOBAL_MAX_SHIFT_PIXELS,
            per_block_max_shift_pixels: HashMap::new(),
            confidence_reduction_min: DEFAULT_CONFIDENCE_REDUCTION_MIN,
            confidence_reduction_max: DEFAULT_CONFIDENCE_REDUCTION_MAX,
            bubble_mismatch_threshold: 3,
            field_mismatch_threshold: 1,
        }
    }
}

impl ShiftDetectionConfig {
    /// Maximum shift allowed for `block_name`.
    pub fn max_shift_for(&self, block_name: &str) -> f64 {
        self.per_block_max_shift_pixels
            .get(block_name)
            .copied()
            .unwrap_or(self.global_max_shift_pixels)
    }
}

impl ConfigValidator for ShiftDetectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_non_negative(self.global_max_shift_pixels, "global_max_shift_pixels")?;
        for (block, max_shift) in &self.per_block_max_shift_pixels {
            self.validate_non_negative(
                *max_shift,
                &format!("per_block_max_shift_pixels.{block}"),
            )?;
        }
        self.validate_confidence(self.confidence_reduction_min, "confidence_reduction_min")?;
        self.validate_confidence(self.confidence_reduction_max, "confidence_reduction_max")?;
        if self.confidence_reduction_min > self.confidence_reduction_max {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "confidence_reduction_min ({}) must not exceed confidence_reduction_max ({})",
                    self.confidence_reduction_min, self.confidence_reduction_max
                ),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// ML collaborator settings: detector confidence cut-offs, fusion policy,
/// block matching radius and training-data collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    /// Enable ML field-block detection and bubble fusion.
    pub enabled: bool,
    /// Minimum detection confidence for field blocks.
    pub field_block_confidence_threshold: f64,
    /// Minimum detection confidence for bubbles.
    pub bubble_confidence_threshold: f64,
    /// Fusion strategy name, resolved through the fusion registry.
    pub fusion_strategy: String,
    /// Confidence above which a detector counts as confident.
    pub high_confidence_threshold: f64,
    /// Traditional confidence below which ML may take over.
    pub low_confidence_threshold: f64,
    /// Largest center distance, in pixels, for matching a detected block to a template block.
    pub max_block_match_distance: f64,
    /// Collect high-confidence fields as training samples.
    pub collect_training_data: bool,
    /// Minimum field confidence for a training sample.
    pub min_training_confidence: f64,
    /// Shift validation bounds.
    pub shift_detection: ShiftDetectionConfig,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            field_block_confidence_threshold: 0.7,
            bubble_confidence_threshold: 0.7,
            fusion_strategy: DEFAULT_FUSION_STRATEGY.to_string(),
            high_confidence_threshold: DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            max_block_match_distance: DEFAULT_MAX_BLOCK_MATCH_DISTANCE,
            collect_training_data: false,
            min_training_confidence: 0.85,
            shift_detection: ShiftDetectionConfig::default(),
        }
    }
}

impl ConfigValidator for MlConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_confidence(
            self.field_block_confidence_threshold,
            "field_block_confidence_threshold",
        )?;
        self.validate_confidence(self.bubble_confidence_threshold, "bubble_confidence_threshold")?;
        self.validate_confidence(self.high_confidence_threshold, "high_confidence_threshold")?;
        self.validate_confidence(self.low_confidence_threshold, "low_confidence_threshold")?;
        self.validate_confidence(self.min_training_confidence, "min_training_confidence")?;
        self.validate_non_negative(self.max_block_match_distance, "max_block_match_distance")?;
        self.shift_detection.validate()
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// The immutable, run-wide configuration object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Threshold constants.
    pub thresholding: ThresholdingConfig,
    /// Output and preview settings.
    pub outputs: OutputsConfig,
    /// Worker pool settings.
    pub processing: ProcessingConfig,
    /// ML, fusion and shift settings.
    pub ml: MlConfig,
}

impl TuningConfig {
    /// Worker count actually used: interactive preview forces sequential runs.
    pub fn effective_workers(&self) -> usize {
        if self.outputs.preview_enabled() {
            1
        } else {
            self.processing.max_parallel_workers.max(1)
        }
    }
}

impl ConfigValidator for TuningConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.thresholding.validate()?;
        self.ml.validate()?;
        self.validate_thread_count(self.processing.max_parallel_workers)?;

        if self.outputs.preview_enabled() && self.processing.max_parallel_workers > 1 {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "show_image_level {} requires max_parallel_workers = 1, got {}",
                    self.outputs.show_image_level, self.processing.max_parallel_workers
                ),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TuningConfig::default().validate().is_ok());
    }

    #[test]
    fn test_preview_requires_single_worker() {
        let mut config = TuningConfig::default();
        config.outputs.show_image_level = 1;
        config.processing.max_parallel_workers = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        config.processing.max_parallel_workers = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_workers_forced_by_preview() {
        let mut config = TuningConfig::default();
        config.processing.max_parallel_workers = 6;
        assert_eq!(config.effective_workers(), 6);
        config.outputs.show_image_level = 2;
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_reduction_bounds_must_be_ordered() {
        let config = ShiftDetectionConfig {
            confidence_reduction_min: 0.6,
            confidence_reduction_max: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_block_margin_rejected() {
        let mut config = ShiftDetectionConfig::default();
        config
            .per_block_max_shift_pixels
            .insert("MCQ_Block_Q1".to_string(), -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_shift_prefers_block_override() {
        let mut config = ShiftDetectionConfig::default();
        config
            .per_block_max_shift_pixels
            .insert("Roll".to_string(), 10.0);
        assert_eq!(config.max_shift_for("Roll"), 10.0);
        assert_eq!(config.max_shift_for("Other"), DEFAULT_GLOBAL_MAX_SHIFT_PIXELS);
    }

    #[test]
    fn test_thresholding_uses_screaming_keys() {
        let json = serde_json::json!({ "MIN_JUMP": 40, "GLOBAL_PAGE_THRESHOLD": 180 });
        let config: ThresholdingConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.min_jump, 40.0);
        assert_eq!(config.global_page_threshold, 180.0);
        assert_eq!(config.min_gap_two_bubbles, DEFAULT_MIN_GAP_TWO_BUBBLES);
    }
}
