//! Validation and application of block shift proposals.
//!
//! Flow for one file: validate proposals against the configured margins,
//! read the template with the accepted shifts applied to a copy, read it
//! again unshifted, compare both readings and lower the confidence of fields
//! that disagree. The canonical template is never modified.

use image::GrayImage;
use tracing::{debug, info, warn};

use super::report::{
    AppliedShifts, ComparisonReport, ConfidenceReduction, FieldMismatch, ShiftOutcome,
    ShiftValidation,
};
use crate::core::config::ShiftDetectionConfig;
use crate::core::errors::OmrResult;
use crate::domain::{MismatchReport, RejectedShift, ShiftProposal, Template, ValidatedShift};
use crate::interpretation::{TemplateReader, TemplateReading};

/// Checks, applies and cross-validates block shifts.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftValidator {
    config: ShiftDetectionConfig,
}

impl ShiftValidator {
    pub fn new(config: ShiftDetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShiftDetectionConfig {
        &self.config
    }

    /// Accepts proposals whose magnitude is within their block's margin.
    pub fn validate(&self, proposals: &[ShiftProposal]) -> ShiftValidation {
        let mut validation = ShiftValidation::default();
        for proposal in proposals {
            let max_allowed = self.config.max_shift_for(&proposal.block_name);
            let magnitude = proposal.magnitude();
            if magnitude <= max_allowed {
                debug!(
                    block = %proposal.block_name,
                    dx = proposal.dx,
                    dy = proposal.dy,
                    "Shift validated"
                );
                validation
                    .accepted
                    .push(ValidatedShift::from_proposal(proposal));
            } else {
                warn!(
                    block = %proposal.block_name,
                    magnitude,
                    max_allowed,
                    "Shift rejected"
                );
                validation.rejected.push(RejectedShift {
                    proposal: proposal.clone(),
                    magnitude,
                    max_allowed,
                });
            }
        }
        validation
    }

    /// Confidence reduction for a mismatch of the given severity.
    pub fn reduction_for(&self, severity: f64) -> f64 {
        let min = self.config.confidence_reduction_min;
        let max = self.config.confidence_reduction_max;
        min + severity.clamp(0.0, 1.0) * (max - min)
    }

    /// Compares a shifted reading against the unshifted baseline, field by field.
    ///
    /// Fields missing from the baseline are skipped.
    pub fn compare(&self, shifted: &TemplateReading, baseline: &TemplateReading) -> ComparisonReport {
        let mut report = ComparisonReport::default();

        for shifted_field in &shifted.interpretations {
            let Some(baseline_field) = baseline.interpretation(&shifted_field.field_id) else {
                continue;
            };

            let differing: Vec<usize> = shifted_field
                .per_item
                .iter()
                .zip(&baseline_field.per_item)
                .filter(|(s, b)| s.is_marked != b.is_marked)
                .map(|(s, _)| s.index)
                .collect();
            let response_differs = shifted_field.response != baseline_field.response;

            let total = baseline_field.per_item.len();
            let severity = if total == 0 {
                0.0
            } else {
                differing.len() as f64 / total as f64
            };

            let mismatch = MismatchReport {
                field_id: shifted_field.field_id.clone(),
                differing_item_indices: differing,
                response_differs,
                severity,
            };
            if !mismatch.has_difference() {
                continue;
            }

            if response_differs {
                report.field_mismatches.push(FieldMismatch {
                    field_id: shifted_field.field_id.clone(),
                    shifted_response: shifted_field.response.clone(),
                    baseline_response: baseline_field.response.clone(),
                });
            }

            let original = shifted_field.confidence_score;
            let reduction = self.reduction_for(severity);
            let final_confidence = (original - reduction).max(0.0);
            debug!(
                field = %shifted_field.field_id,
                items = mismatch.differing_item_indices.len(),
                original,
                final_confidence,
                "Shift mismatch"
            );
            report.confidence_reductions.insert(
                shifted_field.field_id.clone(),
                ConfidenceReduction {
                    original,
                    reduction,
                    final_confidence,
                },
            );
            if !mismatch.differing_item_indices.is_empty() {
                report.bubble_mismatches.push(mismatch);
            }
        }

        report.requires_review = report.bubble_mismatch_count()
            >= self.config.bubble_mismatch_threshold.max(1)
            || report.field_mismatch_count() >= self.config.field_mismatch_threshold.max(1);
        report
    }

    /// Applies the confidence reductions of `report` to `reading`.
    pub fn adjust(&self, mut reading: TemplateReading, report: &ComparisonReport) -> TemplateReading {
        for interpretation in &mut reading.interpretations {
            if let Some(reduction) = report.confidence_reductions.get(&interpretation.field_id) {
                interpretation.confidence_score = reduction.final_confidence;
            }
        }
        reading
    }

    /// Runs the full validate → apply → compare → adjust flow for one file.
    pub fn run(
        &self,
        image: &GrayImage,
        template: &Template,
        reader: &TemplateReader<'_>,
        proposals: &[ShiftProposal],
    ) -> OmrResult<ShiftOutcome> {
        let validation = self.validate(proposals);
        if validation.accepted.is_empty() {
            info!(
                rejected = validation.rejected_count(),
                "No valid shifts to apply"
            );
            return Ok(ShiftOutcome {
                validation,
                applied: None,
            });
        }

        info!(
            accepted = validation.accepted_count(),
            rejected = validation.rejected_count(),
            "Applying validated shifts"
        );

        let shifted = {
            let shifted_template = template.with_shifts(&validation.accepted);
            reader.read(image, &shifted_template)?
        };
        let baseline = reader.read(image, template)?;

        let report = self.compare(&shifted, &baseline);
        let reading = self.adjust(shifted, &report);

        info!(
            bubble_mismatches = report.bubble_mismatch_count(),
            field_mismatches = report.field_mismatch_count(),
            requires_review = report.requires_review,
            "Shift validation complete"
        );

        Ok(ShiftOutcome {
            validation,
            applied: Some(AppliedShifts { reading, report }),
        })
    }
}
