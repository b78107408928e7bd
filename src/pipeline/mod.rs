//! The OMR pipeline module.
//!
//! A pipeline is an ordered list of [`OmrStage`]s run over one
//! [`ProcessingContext`] per file. [`OmrPipelineBuilder`] assembles the
//! stage list from a [`TuningConfig`](crate::core::TuningConfig) and
//! [`BatchProcessor`] runs it over a directory of files.

pub mod batch;
pub mod builder;
mod config;
pub mod context;
pub mod executor;
pub mod stages;
pub mod stats;

pub use batch::{BatchProcessor, EncodedInput, FileInput, ProcessingStrategy};
pub use builder::OmrPipelineBuilder;
pub use config::{ConfigFormat, ConfigLoader};
pub use context::ProcessingContext;
pub use executor::OmrPipeline;
pub use stages::{
    AlignmentStage, ContrastStretch, DetectionInterpretationStage, ImageAligner,
    ImagePreprocessor, MlFieldBlockDetectionStage, OmrStage, PreprocessingStage,
    ShiftValidationStage, StageMetrics, TrainingDataCollectionStage,
};
pub use stats::{PipelineStats, StatsManager};
