//! Builder assembling the stage list from configuration.

use std::sync::Arc;
use tracing::{debug, warn};

use super::executor::OmrPipeline;
use super::stages::{
    AlignmentStage, DetectionInterpretationStage, ImageAligner, ImagePreprocessor,
    MlFieldBlockDetectionStage, PreprocessingStage, ShiftValidationStage,
    TrainingDataCollectionStage,
};
use crate::core::config::{ConfigValidator, TuningConfig};
use crate::core::errors::OmrResult;
use crate::fusion::DetectionFusion;
use crate::ml::{BubbleClassifier, FieldBlockDetector, ObjectDetector, TrainingCollector};
use crate::processors::sampling::{IntensitySampler, MeanIntensitySampler};
use crate::shift::ShiftValidator;

/// Builder for [`OmrPipeline`].
///
/// The backbone (preprocessing, alignment, detection/interpretation) is
/// always present. Optional stages are added only when both the
/// configuration enables them and the collaborator they need was supplied.
///
/// # Examples
///
/// ```rust
/// use omrkit::core::TuningConfig;
/// use omrkit::pipeline::OmrPipelineBuilder;
/// use std::sync::Arc;
///
/// let pipeline = OmrPipelineBuilder::new(Arc::new(TuningConfig::default()))
///     .build()
///     .unwrap();
/// assert_eq!(
///     pipeline.stage_names(),
///     vec!["preprocessing", "alignment", "detection_interpretation"]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct OmrPipelineBuilder {
    config: Arc<TuningConfig>,
    sampler: Arc<dyn IntensitySampler>,
    preprocessors: Vec<Arc<dyn ImagePreprocessor>>,
    aligner: Option<Arc<dyn ImageAligner>>,
    block_detector: Option<Arc<dyn ObjectDetector>>,
    bubble_detector: Option<Arc<dyn ObjectDetector>>,
}

impl OmrPipelineBuilder {
    pub fn new(config: Arc<TuningConfig>) -> Self {
        Self {
            config,
            sampler: Arc::new(MeanIntensitySampler),
            preprocessors: Vec::new(),
            aligner: None,
            block_detector: None,
            bubble_detector: None,
        }
    }

    pub fn sampler(mut self, sampler: Arc<dyn IntensitySampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn preprocessor(mut self, preprocessor: Arc<dyn ImagePreprocessor>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    pub fn aligner(mut self, aligner: Arc<dyn ImageAligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    /// Detector for field blocks, feeding shift validation.
    pub fn block_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.block_detector = Some(detector);
        self
    }

    /// Detector for individual bubbles, feeding fusion.
    pub fn bubble_detector(mut self, detector: Arc<dyn ObjectDetector>) -> Self {
        self.bubble_detector = Some(detector);
        self
    }

    /// Validates the configuration and assembles the pipeline.
    pub fn build(self) -> OmrResult<OmrPipeline> {
        self.config.validate()?;
        let config = &self.config;
        let ml = &config.ml;

        let mut pipeline = OmrPipeline::new();
        pipeline.add_stage(Arc::new(PreprocessingStage::new(self.preprocessors)));
        pipeline.add_stage(Arc::new(AlignmentStage::new(self.aligner)));

        if ml.enabled {
            match self.block_detector {
                Some(detector) => pipeline.add_stage(Arc::new(MlFieldBlockDetectionStage::new(
                    FieldBlockDetector::from_config(detector, ml),
                ))),
                None => debug!("No block detector supplied, ML block detection disabled"),
            }
        }

        if ml.shift_detection.enabled {
            if !ml.enabled {
                warn!("Shift detection enabled without ML; no shift proposals will be produced");
            }
            pipeline.add_stage(Arc::new(ShiftValidationStage::new(
                ShiftValidator::new(ml.shift_detection.clone()),
                Arc::clone(&self.sampler),
                config.thresholding.clone(),
            )));
        }

        let mut detector =
            DetectionInterpretationStage::new(Arc::clone(&self.sampler), config.thresholding.clone())
                .with_confidence_metrics(config.outputs.show_confidence_metrics);
        if ml.enabled {
            match self.bubble_detector {
                Some(bubbles) => {
                    detector = detector.with_fusion(
                        BubbleClassifier::from_config(bubbles, ml),
                        DetectionFusion::from_config(ml),
                    );
                }
                None => debug!("No bubble detector supplied, fusion disabled"),
            }
        }
        pipeline.add_stage(Arc::new(detector));

        if ml.collect_training_data {
            pipeline.add_stage(Arc::new(TrainingDataCollectionStage::new(
                TrainingCollector::new(ml.min_training_confidence),
            )));
        }

        debug!(stages = ?pipeline.stage_names(), "Pipeline assembled");
        Ok(pipeline)
    }
}
