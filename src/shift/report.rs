//! Outcomes of shift validation.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{MismatchReport, RejectedShift, ValidatedShift};
use crate::interpretation::TemplateReading;

/// Proposals split by the magnitude check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShiftValidation {
    pub accepted: Vec<ValidatedShift>,
    pub rejected: Vec<RejectedShift>,
}

impl ShiftValidation {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// A field whose response changed under the shift.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMismatch {
    pub field_id: String,
    pub shifted_response: String,
    pub baseline_response: String,
}

/// Confidence change applied to one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceReduction {
    pub original: f64,
    pub reduction: f64,
    #[serde(rename = "final")]
    pub final_confidence: f64,
}

/// Shifted-versus-baseline comparison of one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// One entry per field with at least one differing item.
    pub bubble_mismatches: Vec<MismatchReport>,
    pub field_mismatches: Vec<FieldMismatch>,
    pub confidence_reductions: BTreeMap<String, ConfidenceReduction>,
    /// Mismatch counts reached the configured review thresholds.
    pub requires_review: bool,
}

impl ComparisonReport {
    /// Total differing items across all fields.
    pub fn bubble_mismatch_count(&self) -> usize {
        self.bubble_mismatches
            .iter()
            .map(|m| m.differing_item_indices.len())
            .sum()
    }

    pub fn field_mismatch_count(&self) -> usize {
        self.field_mismatches.len()
    }

    /// Number of fields whose confidence was reduced.
    pub fn reduced_fields(&self) -> usize {
        self.confidence_reductions.len()
    }

    pub fn total_reduction(&self) -> f64 {
        self.confidence_reductions.values().map(|r| r.reduction).sum()
    }
}

/// The shifted reading kept for a file, with its comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedShifts {
    /// Reading with shifts applied and confidences adjusted.
    pub reading: TemplateReading,
    pub report: ComparisonReport,
}

/// Everything shift validation produced for a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftOutcome {
    pub validation: ShiftValidation,
    /// `None` when no proposal survived validation.
    pub applied: Option<AppliedShifts>,
}

impl ShiftOutcome {
    pub fn applied_shifts(&self) -> &[ValidatedShift] {
        &self.validation.accepted
    }
}
