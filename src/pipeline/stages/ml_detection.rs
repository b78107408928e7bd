//! ML field-block detection stage.

use tracing::info;

use super::{OmrStage, StageMetrics};
use crate::core::errors::OmrResult;
use crate::ml::FieldBlockDetector;
use crate::pipeline::context::ProcessingContext;

/// Detects field blocks and records shift proposals for the shift
/// validation stage.
#[derive(Debug, Clone)]
pub struct MlFieldBlockDetectionStage {
    detector: FieldBlockDetector,
}

impl MlFieldBlockDetectionStage {
    pub fn new(detector: FieldBlockDetector) -> Self {
        Self { detector }
    }
}

impl OmrStage for MlFieldBlockDetectionStage {
    fn name(&self) -> &str {
        "ml_field_block_detection"
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        let blocks = self.detector.detect(&context.gray_image)?;
        let proposals = self.detector.propose_shifts(&context.template, &blocks);
        info!(
            file = %context.file_path,
            blocks = blocks.len(),
            proposals = proposals.len(),
            "ML block alignment computed"
        );

        context.set_metadata("ml_detected_blocks", &blocks);
        context.set_metadata("ml_block_alignments", &proposals);
        let metrics = StageMetrics::new(
            proposals.len(),
            context.template.blocks.len().saturating_sub(proposals.len()),
        )
        .with_info("detector", self.detector.name())
        .with_info("blocks", blocks.len().to_string());
        context.ml_blocks = blocks;
        context.shift_proposals = proposals;
        Ok(metrics)
    }
}
