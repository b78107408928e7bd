//! File-level threshold over every sample of a page.

use super::types::{ThresholdConfig, ThresholdMethod, ThresholdResult, max_jump_scan, sorted_copy};
use super::ThresholdStrategy;

/// Finds the largest gap across all samples of a file.
///
/// The threshold always lies within the sample range when at least two
/// samples are given. A weak gap sets `fallback_used` but the computed
/// threshold is still returned.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalThreshold;

impl GlobalThreshold {
    pub fn new() -> Self {
        Self
    }
}

impl ThresholdStrategy for GlobalThreshold {
    fn name(&self) -> &'static str {
        "global"
    }

    fn calculate(&self, values: &[f64], config: &ThresholdConfig) -> ThresholdResult {
        if values.len() < 2 {
            return ThresholdResult::fallback(config.default_threshold, ThresholdMethod::GlobalDefault);
        }

        let sorted = sorted_copy(values);
        let min_value = sorted[0];
        let max_value = sorted[sorted.len() - 1];

        let (max_jump, threshold) =
            max_jump_scan(&sorted).unwrap_or((0.0, (min_value + max_value) / 2.0));

        let confidence = if config.min_jump > 0.0 {
            (max_jump / (config.min_jump * 3.0)).min(1.0)
        } else {
            0.0
        };

        ThresholdResult::new(
            threshold,
            confidence,
            max_jump,
            ThresholdMethod::GlobalMaxJump,
            max_jump < config.min_jump,
        )
        .with_metadata("num_items", values.len())
        .with_metadata("min_value", min_value)
        .with_metadata("max_value", max_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    #[test]
    fn test_clear_gap() {
        let values = [100.0, 105.0, 110.0, 200.0, 205.0, 210.0];
        let result = GlobalThreshold.calculate(&values, &config());

        assert!(result.threshold_value > 140.0 && result.threshold_value < 170.0);
        assert!(result.confidence > 0.5);
        assert!(!result.fallback_used);
        assert_eq!(result.method_used, ThresholdMethod::GlobalMaxJump);
    }

    #[test]
    fn test_too_few_samples() {
        let config = config();
        for values in [&[][..], &[120.0][..]] {
            let result = GlobalThreshold.calculate(values, &config);
            assert_eq!(result.threshold_value, config.default_threshold);
            assert_eq!(result.confidence, 0.0);
            assert!(result.fallback_used);
        }
    }

    #[test]
    fn test_weak_gap_still_returns_threshold_in_range() {
        let values = [150.0, 152.0, 160.0, 161.0];
        let result = GlobalThreshold.calculate(&values, &config());

        assert!(result.fallback_used);
        assert!(result.threshold_value >= 150.0 && result.threshold_value <= 161.0);
    }

    #[test]
    fn test_two_samples_stay_in_range() {
        let result = GlobalThreshold.calculate(&[90.0, 220.0], &config());
        assert_eq!(result.threshold_value, 155.0);
        assert!(result.fallback_used);
    }

    #[test]
    fn test_does_not_mutate_and_is_deterministic() {
        let values = vec![210.0, 100.0, 205.0, 105.0];
        let first = GlobalThreshold.calculate(&values, &config());
        let second = GlobalThreshold.calculate(&values, &config());
        assert_eq!(values, vec![210.0, 100.0, 205.0, 105.0]);
        assert_eq!(first, second);
    }
}
