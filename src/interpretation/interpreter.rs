//! Marked/unmarked decisions, responses and confidence for one field.

use tracing::{debug, warn};

use super::file_thresholds::FileThresholds;
use crate::core::constants::MARGIN_NORMALIZATION;
use crate::domain::{
    ConfidenceMetrics, FieldDetectionResult, FieldInterpretation, ItemInterpretation,
};
use crate::threshold::{LocalThreshold, ThresholdConfig, ThresholdResult, ThresholdStrategy};

const THRESHOLD_WEIGHT: f64 = 0.35;
const MARGIN_WEIGHT: f64 = 0.25;
const SCAN_QUALITY_WEIGHT: f64 = 0.20;

const MULTI_MARK_PENALTY: f64 = 0.3;
const NO_MARK_PENALTY: f64 = 0.1;
const DISPARITY_PENALTY_SCALE: f64 = 0.4;

/// Interprets fields against a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInterpreter {
    config: ThresholdConfig,
    empty_value: String,
}

impl FieldInterpreter {
    pub fn new(config: ThresholdConfig, empty_value: impl Into<String>) -> Self {
        Self {
            config,
            empty_value: empty_value.into(),
        }
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn empty_value(&self) -> &str {
        &self.empty_value
    }

    /// Interprets `detection` with a local threshold that falls back to the
    /// file's fallback threshold.
    pub fn interpret(
        &self,
        detection: &FieldDetectionResult,
        file_thresholds: &FileThresholds,
    ) -> FieldInterpretation {
        let threshold = LocalThreshold::new(Some(file_thresholds.fallback_threshold))
            .calculate(&detection.values(), &self.config);
        self.interpret_with_threshold(detection, threshold, file_thresholds.fallback_threshold)
    }

    /// Interprets `detection` with an already computed threshold.
    ///
    /// `global_threshold` is only used to find items the local and global
    /// thresholds disagree on.
    pub fn interpret_with_threshold(
        &self,
        detection: &FieldDetectionResult,
        threshold: ThresholdResult,
        global_threshold: f64,
    ) -> FieldInterpretation {
        let local_threshold = threshold.threshold_value;

        let per_item: Vec<ItemInterpretation> = detection
            .samples
            .iter()
            .enumerate()
            .map(|(index, sample)| ItemInterpretation {
                index,
                label: sample.label.clone(),
                is_marked: sample.value < local_threshold,
                value: sample.value,
            })
            .collect();

        let marked_count = per_item.iter().filter(|item| item.is_marked).count();
        let is_multi_marked = marked_count > 1;
        let response = self.response_for(&per_item, marked_count);

        let disparity_items: Vec<usize> = detection
            .samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| {
                (sample.value < local_threshold) != (sample.value < global_threshold)
            })
            .map(|(index, _)| index)
            .collect();

        if is_multi_marked {
            warn!(
                field = %detection.field_label,
                marked = marked_count,
                "Multi-marking detected"
            );
        }
        if !disparity_items.is_empty() {
            debug!(
                field = %detection.field_label,
                items_in_doubt = disparity_items.len(),
                local_threshold,
                global_threshold,
                "Threshold disparity"
            );
        }

        let metrics = confidence_metrics(
            detection,
            &threshold,
            &per_item,
            marked_count,
            disparity_items.len(),
        );

        FieldInterpretation {
            field_id: detection.field_id.clone(),
            field_label: detection.field_label.clone(),
            per_item,
            is_multi_marked,
            response,
            confidence_score: metrics.overall,
            threshold,
            local_threshold,
            global_threshold,
            disparity_items,
            metrics,
        }
    }

    /// Concatenates marked labels in item order.
    ///
    /// No marks and all items marked both produce the empty value: a fully
    /// dark field is read as a scan artifact.
    fn response_for(&self, per_item: &[ItemInterpretation], marked_count: usize) -> String {
        if marked_count == 0 || marked_count == per_item.len() {
            return self.empty_value.clone();
        }
        per_item
            .iter()
            .filter(|item| item.is_marked)
            .map(|item| item.label.as_str())
            .collect()
    }
}

fn confidence_metrics(
    detection: &FieldDetectionResult,
    threshold: &ThresholdResult,
    per_item: &[ItemInterpretation],
    marked_count: usize,
    disparity_count: usize,
) -> ConfidenceMetrics {
    let threshold_value = threshold.threshold_value;

    // Margins of the marked items, or of the unmarked ones when nothing is marked.
    let margins: Vec<f64> = per_item
        .iter()
        .filter(|item| item.is_marked == (marked_count > 0))
        .map(|item| (item.value - threshold_value).abs())
        .collect();
    let margin_confidence = if margins.is_empty() {
        0.0
    } else {
        let mean = margins.iter().sum::<f64>() / margins.len() as f64;
        (mean / MARGIN_NORMALIZATION).min(1.0)
    };

    let threshold_confidence = threshold.confidence;
    let scan_quality_factor = detection.scan_quality().factor();

    let multi_mark_penalty = match marked_count {
        0 => NO_MARK_PENALTY,
        1 => 0.0,
        _ => MULTI_MARK_PENALTY,
    };
    let disparity_penalty = if per_item.is_empty() {
        0.0
    } else {
        DISPARITY_PENALTY_SCALE * disparity_count as f64 / per_item.len() as f64
    };

    let weighted = (THRESHOLD_WEIGHT * threshold_confidence
        + MARGIN_WEIGHT * margin_confidence
        + SCAN_QUALITY_WEIGHT * scan_quality_factor)
        / (THRESHOLD_WEIGHT + MARGIN_WEIGHT + SCAN_QUALITY_WEIGHT);
    let overall = (weighted * (1.0 - multi_mark_penalty - disparity_penalty)).clamp(0.0, 1.0);

    ConfidenceMetrics {
        threshold_confidence,
        margin_confidence,
        scan_quality_factor,
        multi_mark_penalty,
        disparity_penalty,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntensitySample;
    use crate::processors::geometry::Point;
    use crate::threshold::ThresholdMethod;

    fn detection(values: &[f64]) -> FieldDetectionResult {
        let labels = ["A", "B", "C", "D", "E"];
        let samples = values
            .iter()
            .zip(labels)
            .map(|(v, label)| IntensitySample::new(*v, Point::default(), label))
            .collect();
        FieldDetectionResult::new("q1", "q1", samples)
    }

    fn fixed_threshold(value: f64, confidence: f64) -> ThresholdResult {
        ThresholdResult::new(value, confidence, 100.0, ThresholdMethod::LocalMaxJump, false)
    }

    fn interpreter() -> FieldInterpreter {
        FieldInterpreter::new(ThresholdConfig::default(), "")
    }

    #[test]
    fn test_single_mark() {
        let result = interpreter().interpret_with_threshold(
            &detection(&[210.0, 90.0, 205.0, 215.0]),
            fixed_threshold(150.0, 1.0),
            150.0,
        );
        assert_eq!(result.response, "B");
        assert!(!result.is_multi_marked);
        assert_eq!(result.marked_count(), 1);
        assert_eq!(result.metrics.multi_mark_penalty, 0.0);
        assert!(result.confidence_score > 0.8);
    }

    #[test]
    fn test_all_marked_is_empty_but_flagged() {
        let result = interpreter().interpret_with_threshold(
            &detection(&[80.0, 90.0, 85.0]),
            fixed_threshold(150.0, 0.9),
            150.0,
        );
        assert_eq!(result.response, "");
        assert!(result.is_multi_marked);
        assert_eq!(result.marked_count(), 3);
    }

    #[test]
    fn test_no_marks_uses_empty_value() {
        let interpreter = FieldInterpreter::new(ThresholdConfig::default(), "-");
        let result = interpreter.interpret_with_threshold(
            &detection(&[200.0, 210.0]),
            fixed_threshold(150.0, 0.7),
            150.0,
        );
        assert_eq!(result.response, "-");
        assert!(!result.is_multi_marked);
        assert_eq!(result.metrics.multi_mark_penalty, NO_MARK_PENALTY);
    }

    #[test]
    fn test_multi_mark_keeps_order() {
        let result = interpreter().interpret_with_threshold(
            &detection(&[90.0, 210.0, 95.0, 220.0]),
            fixed_threshold(150.0, 1.0),
            150.0,
        );
        assert_eq!(result.response, "AC");
        assert!(result.is_multi_marked);
        assert_eq!(result.metrics.multi_mark_penalty, MULTI_MARK_PENALTY);
    }

    #[test]
    fn test_disparity_penalty() {
        // 170 is marked locally (< 180) but not globally (>= 160).
        let result = interpreter().interpret_with_threshold(
            &detection(&[90.0, 170.0, 220.0, 230.0]),
            fixed_threshold(180.0, 1.0),
            160.0,
        );
        assert_eq!(result.disparity_items, vec![1]);
        assert!((result.metrics.disparity_penalty - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_stays_in_unit_range() {
        let cases: [&[f64]; 4] = [&[], &[120.0], &[0.0, 255.0, 0.0], &[100.0, 101.0, 102.0]];
        for values in cases {
            let result = interpreter().interpret_with_threshold(
                &detection(values),
                fixed_threshold(101.5, 1.0),
                255.0,
            );
            assert!((0.0..=1.0).contains(&result.confidence_score));
        }
    }

    #[test]
    fn test_interpret_uses_file_fallback() {
        let fields = vec![detection(&[100.0, 110.0])];
        let thresholds = FileThresholds {
            fallback_threshold: 180.0,
            ..FileThresholds::compute(&fields, &Default::default())
        };
        let result = interpreter().interpret(&fields[0], &thresholds);
        assert_eq!(result.local_threshold, 180.0);
        assert!(result.threshold.fallback_used);
        // Both items fall under the fallback: read as empty.
        assert_eq!(result.response, "");
    }
}
