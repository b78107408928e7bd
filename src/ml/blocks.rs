//! Field-block detection and shift proposals.

use image::GrayImage;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use super::detector::{BlockClass, Detection, ObjectDetector};
use crate::core::config::MlConfig;
use crate::core::errors::{OMRError, OmrResult};
use crate::domain::{ShiftProposal, Template};

/// Locates field blocks on a page and turns them into shift proposals.
#[derive(Debug, Clone)]
pub struct FieldBlockDetector {
    detector: Arc<dyn ObjectDetector>,
    confidence_threshold: f64,
    max_match_distance: f64,
}

impl FieldBlockDetector {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        confidence_threshold: f64,
        max_match_distance: f64,
    ) -> Self {
        Self {
            detector,
            confidence_threshold,
            max_match_distance,
        }
    }

    pub fn from_config(detector: Arc<dyn ObjectDetector>, config: &MlConfig) -> Self {
        Self::new(
            detector,
            config.field_block_confidence_threshold,
            config.max_block_match_distance,
        )
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    /// Runs the detector on the whole page.
    ///
    /// Detections below the confidence threshold are dropped; the rest are
    /// sorted top-to-bottom, then left-to-right.
    pub fn detect(&self, image: &GrayImage) -> OmrResult<Vec<Detection>> {
        let mut blocks: Vec<Detection> = self
            .detector
            .predict(image)
            .map_err(|e| wrap(self.detector.name(), e))?
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();
        blocks.sort_by(|a, b| {
            let (a, b) = (a.bbox.origin(), b.bbox.origin());
            a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
        });

        for block in &blocks {
            debug!(
                class = BlockClass::from_id(block.class_id).map_or("unknown", |c| c.as_str()),
                confidence = block.confidence,
                x = block.bbox.x_min,
                y = block.bbox.y_min,
                "Detected field block"
            );
        }
        info!(
            detector = self.detector.name(),
            blocks = blocks.len(),
            "Field block detection complete"
        );
        Ok(blocks)
    }

    /// Matches template blocks to detected blocks and proposes shifts.
    ///
    /// Candidate pairs are taken greedily by ascending center distance; each
    /// template block and each detection is used at most once, and pairs
    /// farther apart than the match distance are never taken. Proposals are
    /// returned in template block order.
    pub fn propose_shifts(&self, template: &Template, detections: &[Detection]) -> Vec<ShiftProposal> {
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for (block_idx, block) in template.blocks.iter().enumerate() {
            let center = block.bbox().center();
            for (det_idx, detection) in detections.iter().enumerate() {
                let distance = center.distance_to(&detection.bbox.center());
                if distance < self.max_match_distance {
                    candidates.push((block_idx, det_idx, distance));
                }
            }
        }
        candidates.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        let mut matched: Vec<Option<(usize, f64)>> = vec![None; template.blocks.len()];
        let mut used = vec![false; detections.len()];
        for (block_idx, det_idx, distance) in candidates {
            if matched[block_idx].is_some() || used[det_idx] {
                continue;
            }
            matched[block_idx] = Some((det_idx, distance));
            used[det_idx] = true;
        }

        template
            .blocks
            .iter()
            .zip(matched)
            .filter_map(|(block, found)| {
                let (det_idx, distance) = found?;
                let detection = &detections[det_idx];
                let origin = block.bbox().origin();
                let detected = detection.bbox.origin();
                let proposal = ShiftProposal::new(
                    block.name.clone(),
                    detected.x - origin.x,
                    detected.y - origin.y,
                    detection.confidence,
                );
                debug!(
                    block = %block.name,
                    dx = proposal.dx,
                    dy = proposal.dy,
                    distance,
                    confidence = proposal.confidence,
                    "Matched field block"
                );
                Some(proposal)
            })
            .collect()
    }
}

/// Attributes a detector failure to the detector that produced it.
pub(crate) fn wrap(detector: &str, error: OMRError) -> OMRError {
    match error {
        already @ OMRError::Detector { .. } => already,
        other => OMRError::detector_error(detector, other),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted detectors for tests.

    use super::*;
    use std::sync::Mutex;

    /// Returns the same detections for every call and records crop sizes.
    #[derive(Debug, Default)]
    pub struct FixedDetector {
        pub detections: Vec<Detection>,
        pub calls: Mutex<Vec<(u32, u32)>>,
    }

    impl FixedDetector {
        pub fn new(detections: Vec<Detection>) -> Self {
            Self {
                detections,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ObjectDetector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, image: &GrayImage) -> OmrResult<Vec<Detection>> {
            self.calls.lock().unwrap().push(image.dimensions());
            Ok(self.detections.clone())
        }
    }

    /// Always fails.
    #[derive(Debug)]
    pub struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _image: &GrayImage) -> OmrResult<Vec<Detection>> {
            Err(OMRError::invalid_input("model not loaded"))
        }
    }
}
