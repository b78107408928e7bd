//! # omrkit
//!
//! The signal-to-decision engine of an optical mark recognition system:
//! it turns the darkness measured under each bubble of a scanned answer
//! sheet into marked/unmarked decisions, field responses and confidence
//! scores.
//!
//! ## Features
//!
//! - Global, local and adaptive threshold strategies with graceful fallbacks
//! - Field interpretation with multi-mark detection and confidence metrics
//! - Fusion of the threshold reading with an external ML bubble detector
//! - Validation of ML-proposed block shifts against a baseline reading
//! - A scoped repository of per-field results
//! - A stage-based pipeline run over a directory on a bounded worker pool
//!
//! ## Modules
//!
//! * [`core`] - Configuration, constants, error handling and logging setup
//! * [`domain`] - Samples, interpretations, the sheet template and shifts
//! * [`threshold`] - Threshold strategies and their registry
//! * [`interpretation`] - Field interpretation over a whole template
//! * [`repository`] - Scoped store of detection and interpretation results
//! * [`fusion`] - Traditional/ML reconciliation strategies
//! * [`shift`] - Shift validation and confidence adjustment
//! * [`ml`] - Contracts and adapters for external object detectors
//! * [`processors`] - Geometry and intensity sampling
//! * [`pipeline`] - Stages, the pipeline executor and batch processing
//!
//! ## Quick Start
//!
//! ```rust
//! use omrkit::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load_from_toml(
//!     r#"
//!     [thresholding]
//!     MIN_JUMP = 25.0
//!     "#,
//! )?;
//! let config = Arc::new(config);
//!
//! let template = Arc::new(Template::new(vec![FieldBlock::new(
//!     "MCQ",
//!     Point::new(0.0, 0.0),
//!     Dimensions::new(100.0, 40.0),
//!     vec![Field::new(
//!         "q1",
//!         "q1",
//!         ["A", "B", "C"]
//!             .iter()
//!             .enumerate()
//!             .map(|(i, label)| {
//!                 ScanBox::new(*label, Point::new(10.0 + 30.0 * i as f64, 10.0), Dimensions::new(10.0, 10.0))
//!             })
//!             .collect(),
//!     )],
//! )]));
//!
//! let pipeline = OmrPipelineBuilder::new(Arc::clone(&config)).build()?;
//! let processor = BatchProcessor::new(pipeline, template, config);
//!
//! let sheet = image::GrayImage::from_pixel(100, 40, image::Luma([230]));
//! let results = processor.process_directory("scans", vec![FileInput::new("s1.png", sheet)])?;
//! assert_eq!(results.len(), 1);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod domain;
pub mod processors;

// Decision engine
pub mod fusion;
pub mod interpretation;
pub mod ml;
pub mod repository;
pub mod shift;
pub mod threshold;

pub mod pipeline;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use omrkit::prelude::*;
/// ```
///
/// Included items focus on running a pipeline:
/// - Configuration (`TuningConfig`, `ConfigLoader`)
/// - The sheet layout (`Template`, `FieldBlock`, `Field`, `ScanBox`, geometry)
/// - Pipeline assembly and batch runs (`OmrPipelineBuilder`, `BatchProcessor`, `FileInput`, `EncodedInput`)
/// - Results (`ProcessingContext`, `FieldInterpretation`, `PipelineStats`)
/// - Essential error and result types (`OMRError`, `OmrResult`)
///
/// For custom stages, threshold strategies or detectors, import directly
/// from the respective modules (e.g., `omrkit::pipeline::stages`,
/// `omrkit::threshold`, `omrkit::ml`).
pub mod prelude {
    // Configuration
    pub use crate::core::TuningConfig;
    pub use crate::pipeline::ConfigLoader;

    // Layout
    pub use crate::domain::{Field, FieldBlock, FieldInterpretation, ScanBox, Template};
    pub use crate::processors::{BoundingBox, Dimensions, Point};

    // Pipeline
    pub use crate::pipeline::{
        BatchProcessor, EncodedInput, FileInput, OmrPipeline, OmrPipelineBuilder, PipelineStats,
        ProcessingContext,
    };

    // Error Handling (essential)
    pub use crate::core::{OMRError, OmrResult};
}
