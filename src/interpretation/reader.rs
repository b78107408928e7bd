//! Whole-template reading: sample, threshold, interpret.

use image::GrayImage;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::file_thresholds::FileThresholds;
use super::interpreter::FieldInterpreter;
use crate::core::config::ThresholdingConfig;
use crate::core::errors::OmrResult;
use crate::domain::{
    ConfidenceMetrics, FieldDetectionResult, FieldInterpretation, ScanQuality, Template,
};
use crate::processors::sampling::IntensitySampler;
use crate::threshold::ThresholdConfig;

/// Everything produced by reading one template on one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateReading {
    /// Raw samples per field, in template order.
    pub detections: Vec<FieldDetectionResult>,
    pub thresholds: FileThresholds,
    /// One interpretation per field, in template order.
    pub interpretations: Vec<FieldInterpretation>,
}

impl TemplateReading {
    /// Interprets already collected detections.
    pub fn from_detections(
        detections: Vec<FieldDetectionResult>,
        config: &ThresholdingConfig,
        empty_value: &str,
    ) -> Self {
        let thresholds = FileThresholds::compute(&detections, config);
        let interpreter = FieldInterpreter::new(ThresholdConfig::page(config), empty_value);
        let interpretations = detections
            .iter()
            .map(|detection| interpreter.interpret(detection, &thresholds))
            .collect();
        Self {
            detections,
            thresholds,
            interpretations,
        }
    }

    pub fn interpretation(&self, field_id: &str) -> Option<&FieldInterpretation> {
        self.interpretations.iter().find(|i| i.field_id == field_id)
    }

    /// Field label to response.
    pub fn response_map(&self) -> BTreeMap<String, String> {
        self.interpretations
            .iter()
            .map(|i| (i.field_label.clone(), i.response.clone()))
            .collect()
    }

    /// Confidence reports for `interpretations`, matched to this reading's
    /// detections by field id. Fields without a detection are skipped.
    pub fn confidence_report(
        &self,
        interpretations: &[FieldInterpretation],
    ) -> Vec<FieldConfidenceReport> {
        interpretations
            .iter()
            .filter_map(|interpretation| {
                let detection = self
                    .detections
                    .iter()
                    .find(|d| d.field_id == interpretation.field_id)?;
                Some(FieldConfidenceReport::new(detection, interpretation, &self.thresholds))
            })
            .collect()
    }

    /// Whether the page-level threshold itself fell back.
    pub fn file_threshold_fallback(&self) -> bool {
        self.thresholds.fallback.fallback_used
    }

    /// Number of fields whose threshold fell back.
    pub fn threshold_fallbacks(&self) -> usize {
        self.interpretations
            .iter()
            .filter(|i| i.threshold.fallback_used)
            .count()
    }

    pub fn multi_marked_fields(&self) -> usize {
        self.interpretations
            .iter()
            .filter(|i| i.is_multi_marked)
            .count()
    }
}

/// Confidence breakdown of one field, emitted when confidence metrics are
/// enabled in the outputs config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConfidenceReport {
    pub field_id: String,
    pub confidence_score: f64,
    pub metrics: ConfidenceMetrics,
    pub scan_quality: ScanQuality,
    /// Scan quality is good or excellent.
    pub reliable_scan: bool,
    /// Spread below the file's outlier deviation threshold.
    pub low_contrast: bool,
    /// Local and file thresholds disagreed on at least one item.
    pub has_disparity: bool,
}

impl FieldConfidenceReport {
    pub fn new(
        detection: &FieldDetectionResult,
        interpretation: &FieldInterpretation,
        thresholds: &FileThresholds,
    ) -> Self {
        Self {
            field_id: interpretation.field_id.clone(),
            confidence_score: interpretation.confidence_score,
            metrics: interpretation.metrics.clone(),
            scan_quality: detection.scan_quality(),
            reliable_scan: detection.is_reliable(),
            low_contrast: thresholds.is_low_contrast(detection),
            has_disparity: interpretation.has_disparity(),
        }
    }
}

/// Reads every field of a template using a sampler.
#[derive(Debug, Clone, Copy)]
pub struct TemplateReader<'a> {
    sampler: &'a dyn IntensitySampler,
    config: &'a ThresholdingConfig,
}

impl<'a> TemplateReader<'a> {
    pub fn new(sampler: &'a dyn IntensitySampler, config: &'a ThresholdingConfig) -> Self {
        Self { sampler, config }
    }

    /// Samples every field, honoring each block's shift.
    pub fn detect(
        &self,
        image: &GrayImage,
        template: &Template,
    ) -> OmrResult<Vec<FieldDetectionResult>> {
        template
            .fields()
            .map(|(block, field)| {
                let samples = self.sampler.sample_field(image, field, block.shift)?;
                Ok(FieldDetectionResult::new(
                    field.id.clone(),
                    field.label.clone(),
                    samples,
                ))
            })
            .collect()
    }

    /// Samples, thresholds and interprets every field of `template`.
    pub fn read(&self, image: &GrayImage, template: &Template) -> OmrResult<TemplateReading> {
        let detections = self.detect(image, template)?;
        let reading = TemplateReading::from_detections(detections, self.config, &template.empty_value);
        debug!(
            fields = reading.interpretations.len(),
            fallbacks = reading.threshold_fallbacks(),
            multi_marked = reading.multi_marked_fields(),
            "Read template"
        );
        Ok(reading)
    }
}
