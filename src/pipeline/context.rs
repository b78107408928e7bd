//! Per-file processing context.
//!
//! One context is created per input file and threaded through every stage.
//! It is owned by the worker processing that file and never shared.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::stages::StageMetrics;
use super::stats::PipelineStats;
use crate::domain::{FieldInterpretation, ShiftProposal, Template};
use crate::fusion::FusionOutcome;
use crate::interpretation::TemplateReading;
use crate::ml::{Detection, TrainingSample};
use crate::shift::ShiftOutcome;

/// Everything known about one file while it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub file_path: String,
    /// Working image; preprocessing and alignment replace it in place.
    pub gray_image: GrayImage,
    /// Canonical layout, shared by every file of the run.
    pub template: Arc<Template>,
    /// Free-form results for downstream consumers.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Traditional reading: detections, file thresholds and interpretations.
    pub reading: Option<TemplateReading>,
    /// Final per-field interpretations, after fusion when it ran.
    pub interpretations: Vec<FieldInterpretation>,
    /// Field label to response.
    pub response_map: BTreeMap<String, String>,
    /// At least one field has more than one mark.
    pub is_multi_marked: bool,
    pub ml_blocks: Vec<Detection>,
    pub shift_proposals: Vec<ShiftProposal>,
    pub shift_outcome: Option<ShiftOutcome>,
    pub fusion: Option<FusionOutcome>,
    pub training_samples: Vec<TrainingSample>,
    /// Counters for this file only.
    pub stats: PipelineStats,
    /// Metrics of every stage that ran, in order.
    pub stage_metrics: Vec<(String, StageMetrics)>,
}

impl ProcessingContext {
    pub fn new(file_path: impl Into<String>, gray_image: GrayImage, template: Arc<Template>) -> Self {
        Self {
            file_path: file_path.into(),
            gray_image,
            template,
            metadata: BTreeMap::new(),
            reading: None,
            interpretations: Vec::new(),
            response_map: BTreeMap::new(),
            is_multi_marked: false,
            ml_blocks: Vec::new(),
            shift_proposals: Vec::new(),
            shift_outcome: None,
            fusion: None,
            training_samples: Vec::new(),
            stats: PipelineStats::default(),
            stage_metrics: Vec::new(),
        }
    }

    /// The layout the final reading was taken with: the canonical template,
    /// or a shifted copy when shifts were applied.
    pub fn effective_template(&self) -> Cow<'_, Template> {
        match &self.shift_outcome {
            Some(outcome) if outcome.applied.is_some() => {
                Cow::Owned(self.template.with_shifts(outcome.applied_shifts()))
            }
            _ => Cow::Borrowed(self.template.as_ref()),
        }
    }

    /// Stores a serializable value under `key`. Values that fail to
    /// serialize are dropped.
    pub fn set_metadata<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), json_value);
        }
    }

    /// Get metadata stored by a previous stage.
    pub fn get_metadata<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.metadata
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Sets the final interpretations and everything derived from them.
    pub fn set_interpretations(&mut self, interpretations: Vec<FieldInterpretation>) {
        self.response_map = interpretations
            .iter()
            .map(|i| (i.field_label.clone(), i.response.clone()))
            .collect();
        self.is_multi_marked = interpretations.iter().any(|i| i.is_multi_marked);
        self.interpretations = interpretations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::reader::test_support::template;

    #[test]
    fn test_metadata_round_trip() {
        let mut context = ProcessingContext::new("a.png", GrayImage::new(1, 1), Arc::new(template(1)));
        context.set_metadata("applied", vec![1, 2, 3]);
        assert_eq!(context.get_metadata::<Vec<u32>>("applied"), Some(vec![1, 2, 3]));
        assert_eq!(context.get_metadata::<String>("applied"), None);
        assert_eq!(context.get_metadata::<u32>("missing"), None);
    }

    #[test]
    fn test_effective_template_defaults_to_canonical() {
        let template = Arc::new(template(2));
        let context = ProcessingContext::new("a.png", GrayImage::new(1, 1), Arc::clone(&template));
        assert!(matches!(context.effective_template(), Cow::Borrowed(_)));
        assert_eq!(context.effective_template().as_ref(), template.as_ref());
    }
}
