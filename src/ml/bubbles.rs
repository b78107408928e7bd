//! ML bubble classification for fusion.

use image::{GrayImage, imageops};
use std::sync::Arc;
use tracing::{debug, info};

use super::blocks::wrap;
use super::detector::{BubbleClass, Detection, ObjectDetector};
use crate::core::config::MlConfig;
use crate::core::errors::OmrResult;
use crate::domain::{Field, Template};
use crate::fusion::{MlFieldInterpretation, MlItemPrediction};
use crate::processors::geometry::Point;

/// Reads fields by classifying each bubble with an object detector.
#[derive(Debug, Clone)]
pub struct BubbleClassifier {
    detector: Arc<dyn ObjectDetector>,
    confidence_threshold: f64,
}

impl BubbleClassifier {
    pub fn new(detector: Arc<dyn ObjectDetector>, confidence_threshold: f64) -> Self {
        Self {
            detector,
            confidence_threshold,
        }
    }

    pub fn from_config(detector: Arc<dyn ObjectDetector>, config: &MlConfig) -> Self {
        Self::new(detector, config.bubble_confidence_threshold)
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    /// Classifies every field of `template` on `image`.
    ///
    /// Fields outside the image or with no usable detection get no ML
    /// reading and are left out of the result.
    pub fn classify(&self, image: &GrayImage, template: &Template) -> OmrResult<Vec<MlFieldInterpretation>> {
        let mut readings = Vec::new();
        for (block, field) in template.fields() {
            if let Some(reading) =
                self.classify_field(image, field, block.shift, &template.empty_value)?
            {
                readings.push(reading);
            }
        }
        info!(
            detector = self.detector.name(),
            fields = readings.len(),
            "ML bubble classification complete"
        );
        Ok(readings)
    }

    /// Classifies one field from a crop around its items.
    pub fn classify_field(
        &self,
        image: &GrayImage,
        field: &Field,
        shift: Point,
        empty_value: &str,
    ) -> OmrResult<Option<MlFieldInterpretation>> {
        let Some(region) = field.bbox(shift) else {
            return Ok(None);
        };
        let (width, height) = image.dimensions();
        let Some((x0, y0, x1, y1)) = region.clamp_to_image(width, height) else {
            debug!(field = %field.id, "Field outside image, skipping ML classification");
            return Ok(None);
        };

        let crop = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
        let detections: Vec<Detection> = self
            .detector
            .predict(&crop)
            .map_err(|e| wrap(self.detector.name(), e))?
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .map(|d| d.translated(f64::from(x0), f64::from(y0)))
            .collect();

        let assigned = assign_to_items(field, shift, &detections);
        let per_item: Vec<MlItemPrediction> = field
            .items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let detection = assigned[index]?;
                let class = BubbleClass::from_id(detection.class_id)?;
                Some(MlItemPrediction {
                    index,
                    label: item.label.clone(),
                    is_marked: class.is_marked(),
                    confidence: detection.confidence,
                })
            })
            .collect();

        if per_item.is_empty() {
            debug!(field = %field.id, "No bubble detections assigned");
            return Ok(None);
        }

        let confidence =
            per_item.iter().map(|p| p.confidence).sum::<f64>() / per_item.len() as f64;
        let marked: Vec<&str> = per_item
            .iter()
            .filter(|p| p.is_marked)
            .map(|p| p.label.as_str())
            .collect();
        let response = if marked.is_empty() || marked.len() == field.items.len() {
            empty_value.to_string()
        } else {
            marked.concat()
        };

        Ok(Some(MlFieldInterpretation {
            field_id: field.id.clone(),
            response,
            confidence,
            per_item,
        }))
    }
}

/// Assigns each detection to the nearest item whose center lies within one
/// box size of the detection center. Each item keeps its most confident
/// detection.
fn assign_to_items<'d>(
    field: &Field,
    shift: Point,
    detections: &'d [Detection],
) -> Vec<Option<&'d Detection>> {
    let centers: Vec<(Point, f64)> = field
        .items
        .iter()
        .map(|item| {
            let bbox = item.bbox(shift);
            (bbox.center(), bbox.width().max(bbox.height()))
        })
        .collect();

    let mut assigned: Vec<Option<&Detection>> = vec![None; field.items.len()];
    for detection in detections {
        let center = detection.bbox.center();
        let nearest = centers
            .iter()
            .enumerate()
            .map(|(index, (item_center, size))| (index, center.distance_to(item_center), *size))
            .filter(|(_, distance, size)| distance <= size)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((index, _, _)) = nearest {
            let better = assigned[index].is_none_or(|current| detection.confidence > current.confidence);
            if better {
                assigned[index] = Some(detection);
            }
        }
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::reader::test_support::{BOX, template};
    use crate::ml::blocks::test_support::FixedDetector;
    use crate::processors::geometry::BoundingBox;

    /// Detections in crop coordinates for field `q1`, whose crop starts at
    /// the first item's origin `(20, 20)`.
    fn crop_detection(item: usize, class_id: u32, confidence: f64) -> Detection {
        let x = 20.0 * item as f64;
        Detection::new(BoundingBox::from_coords(x, 0.0, x + BOX, BOX), class_id, confidence)
    }

    #[test]
    fn test_classify_field_maps_crop_coordinates() {
        let template = template(1);
        let (_, field) = template.fields().next().unwrap();
        let detector = Arc::new(FixedDetector::new(vec![
            crop_detection(0, 0, 0.9),
            crop_detection(1, 1, 0.95),
            crop_detection(2, 2, 0.8),
            crop_detection(3, 0, 0.85),
        ]));
        let classifier = BubbleClassifier::new(detector.clone(), 0.7);

        let reading = classifier
            .classify_field(&GrayImage::new(200, 200), field, Point::default(), "")
            .unwrap()
            .unwrap();

        assert_eq!(reading.response, "B");
        assert_eq!(reading.per_item.len(), 4);
        assert!(!reading.per_item[2].is_marked);
        assert!((reading.confidence - 0.875).abs() < 1e-9);
        // Crop covers the four items: 20..90 x 20..30.
        assert_eq!(detector.calls.lock().unwrap()[0], (70, 10));
    }

    #[test]
    fn test_low_confidence_detections_dropped() {
        let template = template(1);
        let (_, field) = template.fields().next().unwrap();
        let detector = Arc::new(FixedDetector::new(vec![crop_detection(1, 1, 0.5)]));
        let classifier = BubbleClassifier::new(detector, 0.7);

        let reading = classifier
            .classify_field(&GrayImage::new(200, 200), field, Point::default(), "")
            .unwrap();
        assert!(reading.is_none());
    }

    #[test]
    fn test_all_filled_reads_empty() {
        let template = template(1).with_empty_value("-");
        let detector = Arc::new(FixedDetector::new(
            (0..4).map(|i| crop_detection(i, 1, 0.9)).collect(),
        ));
        let classifier = BubbleClassifier::new(detector, 0.7);

        let readings = classifier.classify(&GrayImage::new(200, 200), &template).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].response, "-");
        assert!(readings[0].per_item.iter().all(|p| p.is_marked));
    }

    #[test]
    fn test_far_detection_not_assigned() {
        let template = template(1);
        let (_, field) = template.fields().next().unwrap();
        let far = Detection::new(BoundingBox::from_coords(150.0, 150.0, 160.0, 160.0), 1, 0.9);
        assert!(assign_to_items(field, Point::default(), &[far]).iter().all(Option::is_none));
    }
}
