//! The core module of the OMR engine.
//!
//! This module contains the fundamental pieces shared by every component:
//! - Configuration (tuning document, validation, defaults)
//! - Constants used throughout the engine
//! - Error handling
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod config;
pub mod constants;
pub mod errors;

pub use config::{
    ConfigError, ConfigValidator, ConfigValidatorExt, MlConfig, OutputsConfig, ProcessingConfig,
    ShiftDetectionConfig, ThresholdingConfig, TuningConfig,
};
pub use constants::*;
pub use errors::{OMRError, OmrResult, RepositoryError};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called once at the start of an application; filtering is
/// controlled through `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
