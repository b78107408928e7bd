//! Detection fusion.
//!
//! Reconciles the threshold-based reading of each field with an independent
//! ML reading. The strategy is chosen by name from a closed set
//! ([`FusionStrategy`]); an unknown name degrades to `traditional_primary`
//! with a warning instead of failing the run.

pub mod engine;
pub mod strategy;
pub mod types;

pub use engine::DetectionFusion;
pub use strategy::{FusionStrategy, FusionThresholds};
pub use types::{
    Discrepancy, DiscrepancyReason, FusedField, FusionOutcome, FusionSource,
    MlFieldInterpretation, MlItemPrediction,
};
