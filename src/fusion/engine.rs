//! Per-file fusion of traditional and ML readings.

use std::collections::{BTreeMap, HashMap};
use tracing::info;

use super::strategy::{FusionStrategy, FusionThresholds};
use super::types::{FusedField, FusionOutcome, FusionSource, MlFieldInterpretation};
use crate::core::config::MlConfig;
use crate::domain::FieldInterpretation;

/// Merges traditional interpretations with ML readings of the same fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFusion {
    strategy: FusionStrategy,
    thresholds: FusionThresholds,
    unknown_strategy_fallback: bool,
}

impl DetectionFusion {
    /// Creates a fusion engine for a strategy name.
    ///
    /// An unknown name is not an error: the engine falls back to
    /// `traditional_primary` and reports it on every outcome.
    pub fn new(strategy_name: &str, high_confidence: f64, low_confidence: f64) -> Self {
        let (strategy, unknown_strategy_fallback) = FusionStrategy::resolve(strategy_name);
        Self {
            strategy,
            thresholds: FusionThresholds {
                high_confidence,
                low_confidence,
            },
            unknown_strategy_fallback,
        }
    }

    pub fn from_config(config: &MlConfig) -> Self {
        Self::new(
            &config.fusion_strategy,
            config.high_confidence_threshold,
            config.low_confidence_threshold,
        )
    }

    pub fn strategy(&self) -> FusionStrategy {
        self.strategy
    }

    /// Fuses every traditional interpretation with its ML counterpart.
    ///
    /// Fields without an ML reading pass through as traditional.
    /// Discrepancies are listed in the order of `traditional`.
    pub fn fuse(
        &self,
        traditional: &[FieldInterpretation],
        ml: &[MlFieldInterpretation],
    ) -> FusionOutcome {
        let ml_by_field: HashMap<&str, &MlFieldInterpretation> =
            ml.iter().map(|m| (m.field_id.as_str(), m)).collect();

        let mut fused = BTreeMap::new();
        let mut discrepancies = Vec::new();

        for interpretation in traditional {
            let field = match ml_by_field.get(interpretation.field_id.as_str()) {
                Some(ml_reading) => {
                    let (field, discrepancy) =
                        self.strategy
                            .fuse_field(interpretation, ml_reading, self.thresholds);
                    discrepancies.extend(discrepancy);
                    field
                }
                None => FusedField {
                    source: FusionSource::Traditional,
                    interpretation: interpretation.clone(),
                },
            };
            fused.insert(interpretation.field_id.clone(), field);
        }

        let outcome = FusionOutcome {
            strategy: self.strategy,
            fused,
            discrepancies,
            unknown_strategy_fallback: self.unknown_strategy_fallback,
        };
        info!(
            strategy = %self.strategy,
            fields = outcome.fused.len(),
            discrepancies = outcome.discrepancies.len(),
            ml_overrides = outcome.ml_overrides(),
            "Detection fusion complete"
        );
        outcome
    }
}
