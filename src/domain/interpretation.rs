//! Interpreted per-field results.

use serde::{Deserialize, Serialize};

use crate::threshold::ThresholdResult;

/// Decision for one item of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInterpretation {
    /// Position of the item within its field.
    pub index: usize,
    /// Item label, contributed to the response when marked.
    pub label: String,
    pub is_marked: bool,
    /// Intensity the decision was made on.
    pub value: f64,
}

/// Breakdown of a field's confidence score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceMetrics {
    pub threshold_confidence: f64,
    pub margin_confidence: f64,
    pub scan_quality_factor: f64,
    pub multi_mark_penalty: f64,
    pub disparity_penalty: f64,
    /// The final, clamped score.
    pub overall: f64,
}

/// Result of interpreting one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInterpretation {
    pub field_id: String,
    pub field_label: String,
    pub per_item: Vec<ItemInterpretation>,
    /// More than one item marked. Kept even when the response was forced empty.
    pub is_multi_marked: bool,
    /// Concatenated labels of the marked items, or the empty value.
    pub response: String,
    pub confidence_score: f64,
    /// Threshold the decisions were made with.
    pub threshold: ThresholdResult,
    pub local_threshold: f64,
    /// File-level threshold the local one was checked against.
    pub global_threshold: f64,
    /// Indices of items whose state differs between the local and global threshold.
    pub disparity_items: Vec<usize>,
    pub metrics: ConfidenceMetrics,
}

impl FieldInterpretation {
    pub fn marked_count(&self) -> usize {
        self.per_item.iter().filter(|item| item.is_marked).count()
    }

    /// Whether the local and global thresholds disagreed on any item.
    pub fn has_disparity(&self) -> bool {
        !self.disparity_items.is_empty()
    }

    /// Returns a copy with a different confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = confidence.clamp(0.0, 1.0);
        self
    }
}
