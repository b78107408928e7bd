//! Pipeline stages.
//!
//! Every stage implements [`OmrStage`] and works on one
//! [`ProcessingContext`](super::ProcessingContext) at a time. The built-in
//! backbone is preprocessing, alignment and detection/interpretation; the ML
//! block detection, shift validation and training collection stages are
//! spliced in by the builder when configured.

pub mod alignment;
pub mod interpretation;
pub mod ml_detection;
pub mod preprocessing;
pub mod shift;
pub mod training;
pub mod types;

use std::fmt::Debug;

use super::context::ProcessingContext;
use crate::core::errors::OmrResult;

pub use alignment::{AlignmentStage, ImageAligner};
pub use interpretation::DetectionInterpretationStage;
pub use ml_detection::MlFieldBlockDetectionStage;
pub use preprocessing::{ContrastStretch, ImagePreprocessor, PreprocessingStage};
pub use shift::ShiftValidationStage;
pub use training::TrainingDataCollectionStage;
pub use types::StageMetrics;

/// Trait for pipeline stages.
///
/// Stages run strictly in sequence on a context owned by the current file.
/// An error aborts the file; the pipeline wraps it with the stage name.
pub trait OmrStage: Send + Sync + Debug {
    /// Name used to address the stage in the pipeline and in logs.
    fn name(&self) -> &str;

    /// Check if this stage should run for the given context.
    fn is_enabled(&self, context: &ProcessingContext) -> bool {
        let _ = context;
        true
    }

    /// Process the stage.
    ///
    /// # Arguments
    ///
    /// * `context` - The per-file context to read from and update
    ///
    /// # Returns
    ///
    /// Stage metrics; timing is filled in by the pipeline.
    fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics>;
}
