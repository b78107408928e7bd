//! Page-level thresholds shared by every field of one file.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::ThresholdingConfig;
use crate::domain::FieldDetectionResult;
use crate::threshold::{GlobalThreshold, ThresholdConfig, ThresholdResult, ThresholdStrategy};

/// Thresholds computed once per file before any field is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileThresholds {
    /// Global threshold over every sample of the file. Fields whose own gap
    /// is too weak fall back to it.
    pub fallback_threshold: f64,
    pub global_max_jump: f64,
    /// Global threshold over the per-field standard deviations.
    pub outlier_deviation_threshold: f64,
    /// Full result behind `fallback_threshold`.
    pub fallback: ThresholdResult,
    /// Full result behind `outlier_deviation_threshold`.
    pub outlier_deviation: ThresholdResult,
}

impl FileThresholds {
    /// Computes the file thresholds from every field's samples.
    pub fn compute(fields: &[FieldDetectionResult], config: &ThresholdingConfig) -> Self {
        let all_values: Vec<f64> = fields.iter().flat_map(|f| f.values()).collect();
        let fallback = GlobalThreshold.calculate(&all_values, &ThresholdConfig::page(config));

        let deviations: Vec<f64> = fields.iter().map(|f| f.std_deviation()).collect();
        let outlier_deviation =
            GlobalThreshold.calculate(&deviations, &ThresholdConfig::std_deviation(config));

        debug!(
            fallback_threshold = fallback.threshold_value,
            global_max_jump = fallback.max_jump,
            outlier_deviation_threshold = outlier_deviation.threshold_value,
            fallback_used = fallback.fallback_used,
            "Computed file thresholds"
        );

        Self {
            fallback_threshold: fallback.threshold_value,
            global_max_jump: fallback.max_jump,
            outlier_deviation_threshold: outlier_deviation.threshold_value,
            fallback,
            outlier_deviation,
        }
    }

    /// Whether a field's spread is below the file's outlier threshold, i.e.
    /// the field looks flat compared to the rest of the page.
    pub fn is_low_contrast(&self, field: &FieldDetectionResult) -> bool {
        field.std_deviation() < self.outlier_deviation_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntensitySample;
    use crate::processors::geometry::Point;

    fn field(id: &str, values: &[f64]) -> FieldDetectionResult {
        let samples = values
            .iter()
            .map(|v| IntensitySample::new(*v, Point::default(), "x"))
            .collect();
        FieldDetectionResult::new(id, id, samples)
    }

    #[test]
    fn test_compute_from_fields() {
        let fields = vec![
            field("q1", &[100.0, 210.0, 205.0]),
            field("q2", &[200.0, 95.0, 215.0]),
            field("q3", &[208.0, 212.0, 110.0]),
        ];
        let thresholds = FileThresholds::compute(&fields, &ThresholdingConfig::default());

        assert!(thresholds.fallback_threshold > 110.0 && thresholds.fallback_threshold < 200.0);
        assert!(!thresholds.fallback.fallback_used);
        assert!(thresholds.global_max_jump >= 90.0);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ThresholdingConfig::default();
        let thresholds = FileThresholds::compute(&[], &config);
        assert_eq!(thresholds.fallback_threshold, config.global_page_threshold);
        assert_eq!(
            thresholds.outlier_deviation_threshold,
            config.global_page_threshold_std
        );
        assert!(thresholds.fallback.fallback_used);
    }
}
