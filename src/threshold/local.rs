//! Per-field threshold with a file-level fallback.

use super::types::{ThresholdConfig, ThresholdMethod, ThresholdResult, max_jump_scan, sorted_copy};
use super::ThresholdStrategy;

/// Finds the gap inside one field and falls back to a file-level threshold
/// when the field's own signal is too weak.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalThreshold {
    /// File-level threshold used when the local gap is not confident.
    /// `None` falls back to the configured default.
    pub global_fallback: Option<f64>,
}

impl LocalThreshold {
    pub fn new(global_fallback: Option<f64>) -> Self {
        Self { global_fallback }
    }

    fn fallback_threshold(&self, config: &ThresholdConfig) -> f64 {
        self.global_fallback.unwrap_or(config.default_threshold)
    }
}

impl ThresholdStrategy for LocalThreshold {
    fn name(&self) -> &'static str {
        "local"
    }

    fn calculate(&self, values: &[f64], config: &ThresholdConfig) -> ThresholdResult {
        let fallback = self.fallback_threshold(config);

        if values.len() < 2 {
            return ThresholdResult::fallback(fallback, ThresholdMethod::LocalSingleItemFallback);
        }

        let sorted = sorted_copy(values);

        if sorted.len() == 2 {
            let gap = sorted[1] - sorted[0];
            if gap < config.min_gap_two_bubbles {
                return ThresholdResult::new(
                    fallback,
                    0.3,
                    gap,
                    ThresholdMethod::LocalTwoItemsSmallGapFallback,
                    true,
                );
            }
            return ThresholdResult::new(
                (sorted[0] + sorted[1]) / 2.0,
                0.7,
                gap,
                ThresholdMethod::LocalTwoItemsMean,
                false,
            );
        }

        let (max_jump, threshold) = max_jump_scan(&sorted).unwrap_or((0.0, fallback));
        let confident_jump = config.confident_jump();

        if max_jump < confident_jump {
            return ThresholdResult::new(
                fallback,
                0.4,
                max_jump,
                ThresholdMethod::LocalLowConfidenceGlobalFallback,
                true,
            )
            .with_metadata("local_threshold", threshold);
        }

        let confidence = (max_jump / (confident_jump * 2.0)).min(1.0);
        ThresholdResult::new(
            threshold,
            confidence,
            max_jump,
            ThresholdMethod::LocalMaxJump,
            false,
        )
        .with_metadata("num_items", values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_items_small_gap_uses_fallback() {
        let config = ThresholdConfig {
            min_gap_two_bubbles: 30.0,
            ..Default::default()
        };
        let result = LocalThreshold::new(Some(180.0)).calculate(&[100.0, 110.0], &config);

        assert_eq!(result.threshold_value, 180.0);
        assert!(result.fallback_used);
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_two_items_wide_gap_uses_mean() {
        let result = LocalThreshold::new(Some(180.0))
            .calculate(&[80.0, 200.0], &ThresholdConfig::default());
        assert_eq!(result.threshold_value, 140.0);
        assert_eq!(result.confidence, 0.7);
        assert!(!result.fallback_used);
    }

    #[test]
    fn test_single_item_without_fallback_uses_default() {
        let config = ThresholdConfig::default();
        let result = LocalThreshold::default().calculate(&[90.0], &config);
        assert_eq!(result.threshold_value, config.default_threshold);
        assert_eq!(result.confidence, 0.0);
        assert!(result.fallback_used);
    }

    #[test]
    fn test_weak_gap_falls_back_to_global() {
        // confident jump = 25 + 5 = 30
        let values = [150.0, 160.0, 170.0, 175.0];
        let result = LocalThreshold::new(Some(190.0)).calculate(&values, &ThresholdConfig::default());
        assert_eq!(result.threshold_value, 190.0);
        assert_eq!(result.confidence, 0.4);
        assert!(result.fallback_used);
        assert!(result.metadata.contains_key("local_threshold"));
    }

    #[test]
    fn test_confident_gap() {
        let values = [90.0, 200.0, 205.0, 210.0];
        let result = LocalThreshold::new(Some(190.0)).calculate(&values, &ThresholdConfig::default());
        // jump at i=1: 205 - 90 = 115
        assert_eq!(result.max_jump, 115.0);
        assert_eq!(result.threshold_value, 147.5);
        assert_eq!(result.confidence, 1.0);
        assert!(!result.fallback_used);
    }
}
