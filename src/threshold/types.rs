//! Threshold calculation inputs and outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::config::ThresholdingConfig;

/// Constants for one threshold calculation.
///
/// Built from the run's [`ThresholdingConfig`], either in page mode (over
/// intensity values) or in std-deviation mode (over per-field spreads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum jump to consider significant.
    pub min_jump: f64,
    /// Delta between jumps for two-jump detection.
    pub jump_delta: f64,
    /// Minimum gap required when only two items are present.
    pub min_gap_two_bubbles: f64,
    /// Extra jump required to avoid the global fallback.
    pub min_jump_surplus_for_global_fallback: f64,
    /// Extra jump for high confidence despite disparity.
    pub confident_jump_surplus_for_disparity: f64,
    /// Safety margin for the global threshold.
    pub global_threshold_margin: f64,
    /// Threshold returned when no gap can be found.
    pub default_threshold: f64,
}

impl ThresholdConfig {
    /// Configuration for thresholds over item intensities.
    pub fn page(config: &ThresholdingConfig) -> Self {
        Self {
            min_jump: config.min_jump,
            jump_delta: config.jump_delta,
            min_gap_two_bubbles: config.min_gap_two_bubbles,
            min_jump_surplus_for_global_fallback: config.min_jump_surplus_for_global_fallback,
            confident_jump_surplus_for_disparity: config.confident_jump_surplus_for_disparity,
            global_threshold_margin: config.global_threshold_margin,
            default_threshold: config.global_page_threshold,
        }
    }

    /// Configuration for thresholds over per-field standard deviations.
    pub fn std_deviation(config: &ThresholdingConfig) -> Self {
        Self {
            min_jump: config.min_jump_std,
            jump_delta: config.jump_delta_std,
            default_threshold: config.global_page_threshold_std,
            ..Self::page(config)
        }
    }

    pub fn with_default_threshold(mut self, default_threshold: f64) -> Self {
        self.default_threshold = default_threshold;
        self
    }

    /// Jump a local field needs before it is trusted over the fallback.
    pub fn confident_jump(&self) -> f64 {
        self.min_jump + self.min_jump_surplus_for_global_fallback
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::page(&ThresholdingConfig::default())
    }
}

impl From<&ThresholdingConfig> for ThresholdConfig {
    fn from(config: &ThresholdingConfig) -> Self {
        Self::page(config)
    }
}

/// How a threshold value was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    GlobalDefault,
    GlobalMaxJump,
    LocalSingleItemFallback,
    LocalTwoItemsSmallGapFallback,
    LocalTwoItemsMean,
    LocalLowConfidenceGlobalFallback,
    LocalMaxJump,
    AdaptiveAllZeroConfidence,
    AdaptiveWeighted,
}

impl ThresholdMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalDefault => "global_default",
            Self::GlobalMaxJump => "global_max_jump",
            Self::LocalSingleItemFallback => "local_single_item_fallback",
            Self::LocalTwoItemsSmallGapFallback => "local_two_items_small_gap_fallback",
            Self::LocalTwoItemsMean => "local_two_items_mean",
            Self::LocalLowConfidenceGlobalFallback => "local_low_confidence_global_fallback",
            Self::LocalMaxJump => "local_max_jump",
            Self::AdaptiveAllZeroConfidence => "adaptive_all_zero_confidence",
            Self::AdaptiveWeighted => "adaptive_weighted",
        }
    }
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision boundary with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub threshold_value: f64,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,
    pub max_jump: f64,
    pub method_used: ThresholdMethod,
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ThresholdResult {
    pub fn new(
        threshold_value: f64,
        confidence: f64,
        max_jump: f64,
        method_used: ThresholdMethod,
        fallback_used: bool,
    ) -> Self {
        Self {
            threshold_value,
            confidence: confidence.clamp(0.0, 1.0),
            max_jump,
            method_used,
            fallback_used,
            metadata: BTreeMap::new(),
        }
    }

    /// A zero-confidence fallback result.
    pub fn fallback(threshold_value: f64, method_used: ThresholdMethod) -> Self {
        Self::new(threshold_value, 0.0, 0.0, method_used, true)
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Sorts a copy of `values` ascending.
pub(crate) fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Finds the largest gap in sorted values with a look-around radius of one.
///
/// For each `i` in `1..n-1` the jump is `sorted[i+1] - sorted[i-1]` and the
/// candidate threshold sits halfway across it. Returns `(max_jump, threshold)`
/// at the first strict maximum, or `None` when no positive jump exists.
pub(crate) fn max_jump_scan(sorted: &[f64]) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64)> = None;
    for i in 1..sorted.len().saturating_sub(1) {
        let jump = sorted[i + 1] - sorted[i - 1];
        if jump > best.map_or(0.0, |(max_jump, _)| max_jump) {
            best = Some((jump, sorted[i - 1] + jump / 2.0));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_mode_overrides_jump_constants() {
        let base = ThresholdingConfig::default();
        let config = ThresholdConfig::std_deviation(&base);
        assert_eq!(config.min_jump, base.min_jump_std);
        assert_eq!(config.default_threshold, base.global_page_threshold_std);
        assert_eq!(config.min_gap_two_bubbles, base.min_gap_two_bubbles);
    }

    #[test]
    fn test_max_jump_scan() {
        assert_eq!(max_jump_scan(&[100.0, 110.0]), None);
        assert_eq!(max_jump_scan(&[100.0, 100.0, 100.0]), None);
        assert_eq!(
            max_jump_scan(&[100.0, 105.0, 200.0, 210.0]),
            Some((105.0, 157.5))
        );
    }

    #[test]
    fn test_result_confidence_is_clamped() {
        let result = ThresholdResult::new(100.0, 1.7, 10.0, ThresholdMethod::GlobalMaxJump, false);
        assert_eq!(result.confidence, 1.0);
    }
}
