//! Confidence-weighted blend of several strategies.

use super::registry::ThresholdCalculator;
use super::types::{ThresholdConfig, ThresholdMethod, ThresholdResult};
use super::ThresholdStrategy;
use crate::core::errors::{OMRError, OmrResult};

/// Combines sub-strategies, weighting each threshold by
/// `confidence * weight`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveThreshold {
    strategies: Vec<(ThresholdCalculator, f64)>,
}

impl AdaptiveThreshold {
    /// Creates an adaptive strategy from `(strategy, weight)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `OMRError::InvalidInput` when no strategy is given and
    /// `OMRError::Validation` when a weight is negative or not finite.
    pub fn new(strategies: Vec<(ThresholdCalculator, f64)>) -> OmrResult<Self> {
        if strategies.is_empty() {
            return Err(OMRError::invalid_input(
                "adaptive threshold needs at least one strategy",
            ));
        }
        if let Some((strategy, weight)) = strategies
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(OMRError::validation_error(
                "AdaptiveThreshold",
                &format!("{} weight", strategy.name()),
                "a finite non-negative number",
                &weight.to_string(),
            ));
        }
        Ok(Self { strategies })
    }

    /// Global and local strategies weighted 0.4 / 0.6, preferring the local one.
    pub fn global_and_local(global_fallback: Option<f64>) -> Self {
        Self {
            strategies: vec![
                (ThresholdCalculator::global(), 0.4),
                (ThresholdCalculator::local(global_fallback), 0.6),
            ],
        }
    }

    pub fn strategies(&self) -> &[(ThresholdCalculator, f64)] {
        &self.strategies
    }
}

impl ThresholdStrategy for AdaptiveThreshold {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn calculate(&self, values: &[f64], config: &ThresholdConfig) -> ThresholdResult {
        let results: Vec<(ThresholdResult, f64)> = self
            .strategies
            .iter()
            .map(|(strategy, weight)| (strategy.calculate(values, config), *weight))
            .collect();

        let total_weight: f64 = results
            .iter()
            .map(|(result, weight)| result.confidence * weight)
            .sum();

        if total_weight <= 0.0 {
            return ThresholdResult::fallback(
                config.default_threshold,
                ThresholdMethod::AdaptiveAllZeroConfidence,
            );
        }

        let weighted_threshold = results
            .iter()
            .map(|(result, weight)| result.threshold_value * result.confidence * weight)
            .sum::<f64>()
            / total_weight;
        let confidence = results
            .iter()
            .map(|(result, _)| result.confidence)
            .fold(0.0, f64::max);
        let max_jump = results
            .iter()
            .map(|(result, _)| result.max_jump)
            .fold(0.0, f64::max);
        let fallback_used = results.iter().any(|(result, _)| result.fallback_used);

        let breakdown: Vec<serde_json::Value> = results
            .iter()
            .map(|(result, weight)| {
                serde_json::json!({
                    "method": result.method_used.as_str(),
                    "threshold": result.threshold_value,
                    "confidence": result.confidence,
                    "weight": weight,
                })
            })
            .collect();

        ThresholdResult::new(
            weighted_threshold,
            confidence,
            max_jump,
            ThresholdMethod::AdaptiveWeighted,
            fallback_used,
        )
        .with_metadata("strategy_results", breakdown)
    }
}
