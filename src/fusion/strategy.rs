//! Fusion strategies and their name registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use super::types::{Discrepancy, DiscrepancyReason, FusedField, FusionSource, MlFieldInterpretation};
use crate::domain::{FieldInterpretation, ItemInterpretation};

/// Confidence thresholds used by the strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionThresholds {
    /// Both detectors above this count as confident.
    pub high_confidence: f64,
    /// Traditional confidence below this lets the ML reading take over.
    pub low_confidence: f64,
}

/// The closed set of fusion strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Arbitrate by confidence; flag confident disagreements.
    #[default]
    ConfidenceWeighted,
    /// Use ML only when the traditional reading is weak.
    MlFallback,
    /// Always keep the traditional reading; record differences.
    TraditionalPrimary,
}

impl FusionStrategy {
    pub const AVAILABLE: [FusionStrategy; 3] = [
        Self::ConfidenceWeighted,
        Self::MlFallback,
        Self::TraditionalPrimary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfidenceWeighted => "confidence_weighted",
            Self::MlFallback => "ml_fallback",
            Self::TraditionalPrimary => "traditional_primary",
        }
    }

    /// Looks a strategy up by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::AVAILABLE.into_iter().find(|s| s.as_str() == name)
    }

    /// Looks a strategy up by name, falling back to
    /// [`FusionStrategy::TraditionalPrimary`] for unknown names.
    ///
    /// The second value is `true` when the fallback was taken.
    pub fn resolve(name: &str) -> (Self, bool) {
        match Self::from_name(name) {
            Some(strategy) => (strategy, false),
            None => {
                warn!(
                    strategy = name,
                    "Unknown fusion strategy, using traditional detection"
                );
                (Self::TraditionalPrimary, true)
            }
        }
    }

    /// Fuses one field.
    pub fn fuse_field(
        &self,
        traditional: &FieldInterpretation,
        ml: &MlFieldInterpretation,
        thresholds: FusionThresholds,
    ) -> (FusedField, Option<Discrepancy>) {
        let trad_confidence = traditional.confidence_score;
        let ml_confidence = ml.confidence;
        let agree = traditional.response == ml.response;

        let keep_traditional = || FusedField {
            source: FusionSource::Traditional,
            interpretation: traditional.clone(),
        };
        let take_ml = || FusedField {
            source: FusionSource::Ml,
            interpretation: ml_interpretation(traditional, ml),
        };
        let discrepancy = |reason: DiscrepancyReason| Discrepancy {
            field_id: traditional.field_id.clone(),
            reason,
            traditional_response: traditional.response.clone(),
            traditional_confidence: trad_confidence,
            ml_response: ml.response.clone(),
            ml_confidence,
        };

        match self {
            Self::ConfidenceWeighted => {
                if trad_confidence > thresholds.high_confidence
                    && ml_confidence > thresholds.high_confidence
                {
                    if agree {
                        return (keep_traditional(), None);
                    }
                    let record = discrepancy(DiscrepancyReason::HighConfidenceDisagreement);
                    if trad_confidence > ml_confidence {
                        (keep_traditional(), Some(record))
                    } else {
                        (take_ml(), Some(record))
                    }
                } else if trad_confidence < thresholds.low_confidence
                    && ml_confidence > thresholds.high_confidence
                {
                    debug!(
                        field = %traditional.field_id,
                        trad_confidence,
                        ml_confidence,
                        "Using ML reading"
                    );
                    (take_ml(), None)
                } else {
                    (keep_traditional(), None)
                }
            }
            Self::MlFallback => {
                if trad_confidence < thresholds.low_confidence {
                    (take_ml(), None)
                } else {
                    (keep_traditional(), None)
                }
            }
            Self::TraditionalPrimary => {
                let record =
                    (!agree).then(|| discrepancy(DiscrepancyReason::InformationalDifference));
                (keep_traditional(), record)
            }
        }
    }
}

impl fmt::Display for FusionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a field interpretation from an ML reading.
///
/// Item values and threshold details are carried over from the traditional
/// reading so downstream consumers see one consistent shape.
fn ml_interpretation(
    traditional: &FieldInterpretation,
    ml: &MlFieldInterpretation,
) -> FieldInterpretation {
    let per_item: Vec<ItemInterpretation> = traditional
        .per_item
        .iter()
        .map(|item| {
            let is_marked = ml
                .per_item
                .iter()
                .find(|p| p.index == item.index)
                .is_some_and(|p| p.is_marked);
            ItemInterpretation {
                is_marked,
                ..item.clone()
            }
        })
        .collect();
    let marked = per_item.iter().filter(|item| item.is_marked).count();

    let mut interpretation = FieldInterpretation {
        per_item,
        is_multi_marked: marked > 1,
        response: ml.response.clone(),
        ..traditional.clone()
    }
    .with_confidence(ml.confidence);
    interpretation.metrics.overall = interpretation.confidence_score;
    interpretation
}
