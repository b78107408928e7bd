//! Positional corrections for misaligned blocks.

use serde::{Deserialize, Serialize};

/// An untrusted `(dx, dy)` correction proposed for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftProposal {
    pub block_name: String,
    pub dx: f64,
    pub dy: f64,
    /// Confidence of whatever produced the proposal.
    pub confidence: f64,
}

impl ShiftProposal {
    pub fn new(block_name: impl Into<String>, dx: f64, dy: f64, confidence: f64) -> Self {
        Self {
            block_name: block_name.into(),
            dx,
            dy,
            confidence,
        }
    }

    /// Euclidean length of the shift.
    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

/// A shift that passed the magnitude check.
///
/// Only produced by the shift validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedShift {
    pub block_name: String,
    pub dx: f64,
    pub dy: f64,
    pub confidence: f64,
}

impl ValidatedShift {
    pub(crate) fn from_proposal(proposal: &ShiftProposal) -> Self {
        Self {
            block_name: proposal.block_name.clone(),
            dx: proposal.dx,
            dy: proposal.dy,
            confidence: proposal.confidence,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}

/// A proposal that exceeded its block's margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedShift {
    pub proposal: ShiftProposal,
    pub magnitude: f64,
    pub max_allowed: f64,
}

/// Where a shifted and an unshifted reading of one field disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchReport {
    pub field_id: String,
    /// Item indices whose marked state differs.
    pub differing_item_indices: Vec<usize>,
    /// Whether the response strings differ.
    pub response_differs: bool,
    /// Share of differing items, in `0.0..=1.0`.
    pub severity: f64,
}

impl MismatchReport {
    pub fn has_difference(&self) -> bool {
        !self.differing_item_indices.is_empty() || self.response_differs
    }
}
