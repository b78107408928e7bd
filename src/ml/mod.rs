//! ML collaborators.
//!
//! Wraps an external [`ObjectDetector`] for the two jobs the pipeline gives
//! it: proposing block shifts from field-block detections, and reading
//! fields bubble by bubble for fusion. Also gathers labelled bubbles from
//! confident traditional readings for retraining.

pub mod blocks;
pub mod bubbles;
pub mod detector;
pub mod training;

pub use blocks::FieldBlockDetector;
pub use bubbles::BubbleClassifier;
pub use detector::{BlockClass, BubbleClass, Detection, ObjectDetector};
pub use training::{TrainingBatch, TrainingCollector, TrainingItem, TrainingSample};
