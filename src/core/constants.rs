//! Constants used throughout the OMR engine.
//!
//! Default values for the thresholding constants, confidence cut-offs and
//! shift margins. The configuration layer falls back to these when a tuning
//! document leaves a key out.

/// Default minimum jump between sorted intensities for a confident gap.
pub const DEFAULT_MIN_JUMP: f64 = 25.0;

/// Default delta between jumps for two-jump detection.
pub const DEFAULT_JUMP_DELTA: f64 = 30.0;

/// Default minimum gap between the two values of a two-item field.
pub const DEFAULT_MIN_GAP_TWO_BUBBLES: f64 = 30.0;

/// Default surplus over `MIN_JUMP` a field needs before its local
/// threshold is trusted over the page fallback.
pub const DEFAULT_MIN_JUMP_SURPLUS_FOR_GLOBAL_FALLBACK: f64 = 5.0;

pub const DEFAULT_CONFIDENT_JUMP_SURPLUS_FOR_DISPARITY: f64 = 25.0;

pub const DEFAULT_GLOBAL_THRESHOLD_MARGIN: f64 = 10.0;

/// Default page threshold used when no gap can be found.
///
/// Sits in the upper part of the intensity range, so an unconfident page
/// leans toward reading items as unmarked.
pub const DEFAULT_GLOBAL_PAGE_THRESHOLD: f64 = 200.0;

/// Default outlier threshold over per-field standard deviations.
pub const DEFAULT_GLOBAL_PAGE_THRESHOLD_STD: f64 = 10.0;

/// Default minimum jump between sorted per-field standard deviations.
pub const DEFAULT_MIN_JUMP_STD: f64 = 15.0;

pub const DEFAULT_JUMP_DELTA_STD: f64 = 5.0;

/// Maximum intensity value of a sample.
pub const MAX_INTENSITY: f64 = 255.0;

/// Intensity distance at which the margin confidence saturates.
pub const MARGIN_NORMALIZATION: f64 = 50.0;

/// Confidence above which a detector reading counts as confident.
pub const DEFAULT_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.85;

/// Traditional confidence below which the ML reading may take over.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Fusion strategy used when the configuration does not name one.
pub const DEFAULT_FUSION_STRATEGY: &str = "confidence_weighted";

/// Default maximum shift magnitude, in pixels.
pub const DEFAULT_GLOBAL_MAX_SHIFT_PIXELS: f64 = 50.0;

pub const DEFAULT_CONFIDENCE_REDUCTION_MIN: f64 = 0.1;

pub const DEFAULT_CONFIDENCE_REDUCTION_MAX: f64 = 0.5;

/// Default radius, in pixels, for matching a detected block to a template block.
pub const DEFAULT_MAX_BLOCK_MATCH_DISTANCE: f64 = 200.0;

/// The default threshold for parallel processing.
///
/// Batches with fewer files than this run sequentially even when the worker
/// pool allows more.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2;
