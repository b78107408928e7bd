//! Training data collection stage.

use super::{OmrStage, StageMetrics};
use crate::core::errors::OmrResult;
use crate::ml::TrainingCollector;
use crate::pipeline::context::ProcessingContext;

/// Collects labelled bubbles from the final interpretations of a file.
#[derive(Debug, Clone, Copy)]
pub struct TrainingDataCollectionStage {
    collector: TrainingCollector,
}

impl TrainingDataCollectionStage {
    pub fn new(collector: TrainingCollector) -> Self {
        Self { collector }
    }
}

impl OmrStage for TrainingDataCollectionStage {
    fn name(&self) -> &str {
        "training_data_collection"
    }

    fn is_enabled(&self, context: &ProcessingContext) -> bool {
        !context.interpretations.is_empty()
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        let batch = {
            let template = context.effective_template();
            self.collector
                .collect(&context.file_path, &template, &context.interpretations)
        };
        context.stats.training_fields_collected += batch.collected();
        context.stats.training_fields_skipped += batch.skipped;
        let metrics = StageMetrics::new(batch.collected(), batch.skipped);
        context.training_samples.extend(batch.samples);
        Ok(metrics)
    }
}
