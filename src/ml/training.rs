//! In-memory collection of training samples from confident readings.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::detector::BubbleClass;
use crate::domain::{FieldInterpretation, Template};
use crate::processors::geometry::BoundingBox;

/// One labelled bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingItem {
    pub bbox: BoundingBox,
    pub class: BubbleClass,
}

/// Bubble labels harvested from one confidently read field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingSample {
    pub file: String,
    pub field_id: String,
    pub confidence: f64,
    pub items: Vec<TrainingItem>,
}

/// Samples gathered from one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingBatch {
    pub samples: Vec<TrainingSample>,
    pub skipped: usize,
}

impl TrainingBatch {
    pub fn collected(&self) -> usize {
        self.samples.len()
    }
}

/// Turns high-confidence interpretations into labelled bubbles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingCollector {
    min_confidence: f64,
}

impl TrainingCollector {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Collects every field read with at least the minimum confidence.
    ///
    /// Item boxes come from `template`, including any block shift it carries.
    /// Interpretations whose field is not in the template are skipped.
    pub fn collect(
        &self,
        file: &str,
        template: &Template,
        interpretations: &[FieldInterpretation],
    ) -> TrainingBatch {
        let fields: HashMap<&str, _> = template
            .fields()
            .map(|(block, field)| (field.id.as_str(), (block, field)))
            .collect();

        let mut batch = TrainingBatch::default();
        for interpretation in interpretations {
            let Some((block, field)) = fields.get(interpretation.field_id.as_str()) else {
                batch.skipped += 1;
                continue;
            };
            if interpretation.confidence_score < self.min_confidence {
                batch.skipped += 1;
                continue;
            }

            let items = field
                .items
                .iter()
                .zip(&interpretation.per_item)
                .map(|(item, decision)| TrainingItem {
                    bbox: item.bbox(block.shift),
                    class: if decision.is_marked {
                        BubbleClass::BubbleFilled
                    } else {
                        BubbleClass::BubbleEmpty
                    },
                })
                .collect();
            batch.samples.push(TrainingSample {
                file: file.to_string(),
                field_id: interpretation.field_id.clone(),
                confidence: interpretation.confidence_score,
                items,
            });
        }

        debug!(
            file,
            collected = batch.collected(),
            skipped = batch.skipped,
            "Training data collected"
        );
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ThresholdingConfig;
    use crate::interpretation::TemplateReader;
    use crate::interpretation::reader::test_support::{sheet, template};
    use crate::processors::sampling::MeanIntensitySampler;

    #[test]
    fn test_collects_only_confident_fields() {
        let template = template(2);
        let image = sheet(&template, &[(0, 2), (1, 1)], (0, 0));
        let config = ThresholdingConfig::default();
        let sampler = MeanIntensitySampler;
        let mut reading = TemplateReader::new(&sampler, &config)
            .read(&image, &template)
            .unwrap();
        reading.interpretations[0].confidence_score = 0.95;
        reading.interpretations[1].confidence_score = 0.5;

        let batch = TrainingCollector::new(0.85).collect("a.png", &template, &reading.interpretations);

        assert_eq!(batch.collected(), 1);
        assert_eq!(batch.skipped, 1);
        let sample = &batch.samples[0];
        assert_eq!(sample.field_id, "q1");
        assert_eq!(sample.items.len(), 4);
        assert_eq!(sample.items[2].class, BubbleClass::BubbleFilled);
        assert_eq!(sample.items[0].class, BubbleClass::BubbleEmpty);
        assert_eq!(sample.items[2].bbox.x_min, 60.0);
    }

    #[test]
    fn test_unknown_field_is_skipped() {
        let template = template(1);
        let image = sheet(&template, &[(0, 0)], (0, 0));
        let config = ThresholdingConfig::default();
        let sampler = MeanIntensitySampler;
        let mut reading = TemplateReader::new(&sampler, &config)
            .read(&image, &template)
            .unwrap();
        reading.interpretations[0].field_id = "other".to_string();
        reading.interpretations[0].confidence_score = 1.0;

        let batch = TrainingCollector::new(0.85).collect("a.png", &template, &reading.interpretations);
        assert_eq!(batch.collected(), 0);
        assert_eq!(batch.skipped, 1);
    }
}
