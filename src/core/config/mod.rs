//! Configuration management for the OMR engine.
//!
//! A single [`TuningConfig`] is built once per run, validated, and then
//! shared immutably (behind `Arc`) with every strategy and stage.

pub mod errors;
pub mod tuning;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use tuning::{
    MlConfig, OutputsConfig, ProcessingConfig, ShiftDetectionConfig, ThresholdingConfig,
    TuningConfig,
};
