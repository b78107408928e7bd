//! Threshold calculation.
//!
//! Converts a set of intensity samples into a decision boundary with a
//! confidence score. Three strategies share one contract:
//!
//! - [`GlobalThreshold`]: largest gap over every sample of a file
//! - [`LocalThreshold`]: largest gap inside one field, with a file-level fallback
//! - [`AdaptiveThreshold`]: confidence-weighted blend of other strategies
//!
//! Strategies are pure: they sort a copy of the input and never fail. Too
//! few samples or a weak gap degrade to a fallback threshold with
//! `fallback_used` set. [`ThresholdCalculator`] is the name-keyed registry.
//!
//! # Example
//!
//! ```
//! use omrkit::threshold::{ThresholdCalculator, ThresholdConfig, ThresholdStrategy};
//!
//! let calculator = ThresholdCalculator::from_name("global", None).unwrap();
//! let result = calculator.calculate(&[100.0, 105.0, 110.0, 200.0, 205.0, 210.0], &ThresholdConfig::default());
//! assert!(!result.fallback_used);
//! assert!(result.threshold_value > 110.0 && result.threshold_value < 200.0);
//! ```

pub mod adaptive;
pub mod global;
pub mod local;
pub mod registry;
pub mod types;

pub use adaptive::AdaptiveThreshold;
pub use global::GlobalThreshold;
pub use local::LocalThreshold;
pub use registry::ThresholdCalculator;
pub use types::{ThresholdConfig, ThresholdMethod, ThresholdResult};

/// Contract shared by every threshold strategy.
pub trait ThresholdStrategy: Send + Sync {
    /// Registry name of the strategy.
    fn name(&self) -> &'static str;

    /// Computes a threshold for `values`. Deterministic; `values` is not modified.
    fn calculate(&self, values: &[f64], config: &ThresholdConfig) -> ThresholdResult;
}
