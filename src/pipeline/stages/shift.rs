//! Shift validation stage.

use std::sync::Arc;

use super::{OmrStage, StageMetrics};
use crate::core::config::ThresholdingConfig;
use crate::core::errors::OmrResult;
use crate::interpretation::TemplateReader;
use crate::pipeline::context::ProcessingContext;
use crate::processors::sampling::IntensitySampler;
use crate::shift::ShiftValidator;

/// Validates the shift proposals left by block detection and, when any
/// survive, produces the shifted reading used by the detection stage.
#[derive(Debug, Clone)]
pub struct ShiftValidationStage {
    validator: ShiftValidator,
    sampler: Arc<dyn IntensitySampler>,
    thresholding: ThresholdingConfig,
}

impl ShiftValidationStage {
    pub fn new(
        validator: ShiftValidator,
        sampler: Arc<dyn IntensitySampler>,
        thresholding: ThresholdingConfig,
    ) -> Self {
        Self {
            validator,
            sampler,
            thresholding,
        }
    }
}

impl OmrStage for ShiftValidationStage {
    fn name(&self) -> &str {
        "shift_validation"
    }

    fn is_enabled(&self, context: &ProcessingContext) -> bool {
        self.validator.config().enabled && !context.shift_proposals.is_empty()
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        let reader = TemplateReader::new(self.sampler.as_ref(), &self.thresholding);
        let outcome = self.validator.run(
            &context.gray_image,
            &context.template,
            &reader,
            &context.shift_proposals,
        )?;

        let stats = &mut context.stats;
        stats.shifts_accepted += outcome.validation.accepted_count();
        stats.shifts_rejected += outcome.validation.rejected_count();
        if let Some(applied) = &outcome.applied {
            let report = &applied.report;
            stats.shift_bubble_mismatches += report.bubble_mismatch_count();
            stats.shift_field_mismatches += report.field_mismatch_count();
            stats.confidence_reductions += report.reduced_fields();
            stats.confidence_reduction_total += report.total_reduction();
            if report.requires_review {
                stats.files_requiring_review += 1;
            }
        }

        let metrics = StageMetrics::new(
            outcome.validation.accepted_count(),
            outcome.validation.rejected_count(),
        );
        context.set_metadata("shift_detection", &outcome);
        context.shift_outcome = Some(outcome);
        Ok(metrics)
    }
}
