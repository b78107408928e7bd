//! Inputs and outputs of detection fusion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::strategy::FusionStrategy;
use crate::domain::FieldInterpretation;

/// ML decision for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlItemPrediction {
    pub index: usize,
    pub label: String,
    pub is_marked: bool,
    pub confidence: f64,
}

/// An ML detector's reading of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlFieldInterpretation {
    pub field_id: String,
    pub response: String,
    pub confidence: f64,
    pub per_item: Vec<MlItemPrediction>,
}

/// Which detector a fused field was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionSource {
    Traditional,
    Ml,
}

/// The interpretation kept for one field after fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedField {
    pub source: FusionSource,
    pub interpretation: FieldInterpretation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyReason {
    /// Both detectors were confident and disagreed.
    HighConfidenceDisagreement,
    /// The detectors disagreed; recorded for visibility only.
    InformationalDifference,
}

impl DiscrepancyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighConfidenceDisagreement => "high_confidence_disagreement",
            Self::InformationalDifference => "informational_difference",
        }
    }
}

impl fmt::Display for DiscrepancyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded disagreement between the two detectors for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub field_id: String,
    pub reason: DiscrepancyReason,
    pub traditional_response: String,
    pub traditional_confidence: f64,
    pub ml_response: String,
    pub ml_confidence: f64,
}

/// Result of fusing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionOutcome {
    /// Strategy that was actually applied.
    pub strategy: FusionStrategy,
    /// Fused fields by field id.
    pub fused: BTreeMap<String, FusedField>,
    /// Discrepancies in field order.
    pub discrepancies: Vec<Discrepancy>,
    /// Whether the configured strategy name was unknown.
    pub unknown_strategy_fallback: bool,
}

impl FusionOutcome {
    /// Field label to fused response.
    pub fn response_map(&self) -> BTreeMap<String, String> {
        self.fused
            .values()
            .map(|f| {
                (
                    f.interpretation.field_label.clone(),
                    f.interpretation.response.clone(),
                )
            })
            .collect()
    }

    /// Number of fields taken from the ML detector.
    pub fn ml_overrides(&self) -> usize {
        self.fused
            .values()
            .filter(|f| f.source == FusionSource::Ml)
            .count()
    }
}
