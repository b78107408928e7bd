//! Detection and interpretation stage, the terminal detector of the pipeline.

use std::sync::Arc;
use tracing::{debug, info};

use super::{OmrStage, StageMetrics};
use crate::core::config::ThresholdingConfig;
use crate::core::errors::OmrResult;
use crate::fusion::DetectionFusion;
use crate::interpretation::{FieldConfidenceReport, TemplateReader, TemplateReading};
use crate::ml::BubbleClassifier;
use crate::pipeline::context::ProcessingContext;
use crate::processors::sampling::IntensitySampler;

/// Reads every field and, when an ML bubble classifier is attached, fuses
/// the traditional reading with the ML one.
#[derive(Debug, Clone)]
pub struct DetectionInterpretationStage {
    sampler: Arc<dyn IntensitySampler>,
    thresholding: ThresholdingConfig,
    fusion: Option<(BubbleClassifier, DetectionFusion)>,
    show_confidence_metrics: bool,
}

impl DetectionInterpretationStage {
    pub fn new(sampler: Arc<dyn IntensitySampler>, thresholding: ThresholdingConfig) -> Self {
        Self {
            sampler,
            thresholding,
            fusion: None,
            show_confidence_metrics: false,
        }
    }

    /// Enables ML fusion.
    pub fn with_fusion(mut self, classifier: BubbleClassifier, fusion: DetectionFusion) -> Self {
        self.fusion = Some((classifier, fusion));
        self
    }

    /// Logs and records a per-field confidence breakdown under the
    /// `confidence_metrics` metadata key.
    pub fn with_confidence_metrics(mut self, enabled: bool) -> Self {
        self.show_confidence_metrics = enabled;
        self
    }

    pub fn fusion_enabled(&self) -> bool {
        self.fusion.is_some()
    }

    /// The shifted reading from shift validation, or a fresh reading of the
    /// canonical layout.
    fn traditional_reading(&self, context: &ProcessingContext) -> OmrResult<TemplateReading> {
        if let Some(applied) = context.shift_outcome.as_ref().and_then(|o| o.applied.as_ref()) {
            debug!(file = %context.file_path, "Using shifted reading");
            return Ok(applied.reading.clone());
        }
        TemplateReader::new(self.sampler.as_ref(), &self.thresholding)
            .read(&context.gray_image, &context.template)
    }
}

impl OmrStage for DetectionInterpretationStage {
    fn name(&self) -> &str {
        "detection_interpretation"
    }

    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
        let reading = self.traditional_reading(context)?;
        context.stats.threshold_fallbacks += reading.threshold_fallbacks();
        if reading.file_threshold_fallback() {
            context.stats.file_threshold_fallbacks += 1;
        }
        context.stats.multi_marked_fields += reading.multi_marked_fields();

        let mut interpretations = reading.interpretations.clone();
        if let Some((classifier, fusion)) = &self.fusion {
            let ml_readings = {
                let template = context.effective_template();
                classifier.classify(&context.gray_image, &template)?
            };
            let outcome = fusion.fuse(&reading.interpretations, &ml_readings);

            interpretations = reading
                .interpretations
                .iter()
                .map(|i| {
                    outcome
                        .fused
                        .get(&i.field_id)
                        .map_or_else(|| i.clone(), |f| f.interpretation.clone())
                })
                .collect();

            let stats = &mut context.stats;
            stats.fusion_discrepancies += outcome.discrepancies.len();
            stats.ml_overrides += outcome.ml_overrides();
            if outcome.unknown_strategy_fallback {
                stats.unknown_strategy_fallbacks += 1;
            }
            context.set_metadata("fusion_discrepancies", &outcome.discrepancies);
            context.fusion = Some(outcome);
        }

        context.set_metadata("file_thresholds", &reading.thresholds);
        let metrics = StageMetrics::new(interpretations.len(), 0)
            .with_info("threshold_fallbacks", reading.threshold_fallbacks().to_string());
        context.set_interpretations(interpretations);
        if self.show_confidence_metrics {
            let reports = reading.confidence_report(&context.interpretations);
            log_confidence(&context.file_path, &reports);
            context.set_metadata("confidence_metrics", &reports);
        }
        context.reading = Some(reading);

        info!(
            file = %context.file_path,
            fields = context.interpretations.len(),
            multi_marked = context.is_multi_marked,
            "Detection and interpretation complete"
        );
        Ok(metrics)
    }
}

fn log_confidence(file: &str, reports: &[FieldConfidenceReport]) {
    for report in reports {
        debug!(
            file,
            field = %report.field_id,
            confidence = report.confidence_score,
            threshold_confidence = report.metrics.threshold_confidence,
            margin_confidence = report.metrics.margin_confidence,
            scan_quality = %report.scan_quality,
            multi_mark_penalty = report.metrics.multi_mark_penalty,
            disparity_penalty = report.metrics.disparity_penalty,
            disparity = report.has_disparity,
            low_contrast = report.low_contrast,
            "Field confidence"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::FusionSource;
    use crate::interpretation::reader::test_support::{BOX, sheet, template};
    use crate::ml::Detection;
    use crate::ml::blocks::test_support::FixedDetector;
    use crate::processors::geometry::BoundingBox;
    use crate::processors::sampling::MeanIntensitySampler;

    fn stage() -> DetectionInterpretationStage {
        DetectionInterpretationStage::new(Arc::new(MeanIntensitySampler), ThresholdingConfig::default())
    }

    #[test]
    fn test_reads_template() {
        let template = Arc::new(template(3));
        let image = sheet(&template, &[(0, 0), (1, 2), (2, 1), (2, 3)], (0, 0));
        let mut context = ProcessingContext::new("a.png", image, template);

        stage().process(&mut context).unwrap();

        assert_eq!(context.response_map["q1"], "A");
        assert_eq!(context.response_map["q2"], "C");
        assert_eq!(context.response_map["q3"], "BD");
        assert!(context.is_multi_marked);
        assert_eq!(context.stats.multi_marked_fields, 1);
        assert!(context.reading.is_some());
        assert!(context.fusion.is_none());
    }

    #[test]
    fn test_traditional_primary_keeps_reading_and_counts_difference() {
        let template = Arc::new(template(1));
        let image = sheet(&template, &[(0, 0)], (0, 0));
        let mut context = ProcessingContext::new("a.png", image, template);

        // ML sees item D filled, in crop coordinates.
        let x = 60.0;
        let detector = FixedDetector::new(vec![Detection::new(
            BoundingBox::from_coords(x, 0.0, x + BOX, BOX),
            1,
            0.99,
        )]);
        let stage = stage().with_fusion(
            BubbleClassifier::new(Arc::new(detector), 0.7),
            DetectionFusion::new("traditional_primary", 0.85, 0.6),
        );

        stage.process(&mut context).unwrap();

        assert_eq!(context.response_map["q1"], "A");
        let fusion = context.fusion.as_ref().unwrap();
        assert_eq!(fusion.fused["q1"].source, FusionSource::Traditional);
        assert_eq!(context.stats.fusion_discrepancies, 1);
        assert_eq!(context.stats.ml_overrides, 0);
    }

    #[test]
    fn test_unknown_strategy_is_counted() {
        let template = Arc::new(template(1));
        let image = sheet(&template, &[(0, 1)], (0, 0));
        let mut context = ProcessingContext::new("a.png", image, template);
        let stage = stage().with_fusion(
            BubbleClassifier::new(Arc::new(FixedDetector::new(vec![])), 0.7),
            DetectionFusion::new("majority_vote", 0.85, 0.6),
        );

        stage.process(&mut context).unwrap();
        assert_eq!(context.stats.unknown_strategy_fallbacks, 1);
        assert_eq!(context.response_map["q1"], "B");
    }

    #[test]
    fn test_confidence_metrics_toggle() {
        let template = Arc::new(template(2));
        let image = sheet(&template, &[(0, 0)], (0, 0));

        let mut quiet = ProcessingContext::new("a.png", image.clone(), Arc::clone(&template));
        stage().process(&mut quiet).unwrap();
        assert!(quiet.get_metadata::<serde_json::Value>("confidence_metrics").is_none());

        let mut verbose = ProcessingContext::new("a.png", image, template);
        stage().with_confidence_metrics(true).process(&mut verbose).unwrap();
        let reports: serde_json::Value = verbose.get_metadata("confidence_metrics").unwrap();
        let reports = reports.as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["field_id"], "q1");
        assert_eq!(reports[0]["reliable_scan"], true);
        assert_eq!(reports[1]["low_contrast"], true);
        assert_eq!(quiet.response_map, verbose.response_map);
    }

    #[test]
    fn test_file_threshold_fallback_is_counted() {
        let layout = Arc::new(template(2));

        // A blank page has no gap anywhere, so the page threshold falls back.
        let blank = sheet(&layout, &[], (0, 0));
        let mut context = ProcessingContext::new("blank.png", blank, Arc::clone(&layout));
        stage().process(&mut context).unwrap();
        assert_eq!(context.stats.file_threshold_fallbacks, 1);

        let marked = sheet(&layout, &[(0, 0), (1, 2)], (0, 0));
        let mut context = ProcessingContext::new("marked.png", marked, layout);
        stage().process(&mut context).unwrap();
        assert_eq!(context.stats.file_threshold_fallbacks, 0);
    }
}
