//! Domain types shared by every stage of the engine.
//!
//! - [`detection`]: raw intensity samples per field
//! - [`interpretation`]: marked/unmarked decisions and responses
//! - [`layout`]: the sheet template
//! - [`shift`]: proposed and validated block corrections

pub mod detection;
pub mod interpretation;
pub mod layout;
pub mod shift;

pub use detection::{FieldDetectionResult, IntensitySample, ScanQuality};
pub use interpretation::{ConfidenceMetrics, FieldInterpretation, ItemInterpretation};
pub use layout::{Field, FieldBlock, ScanBox, Template};
pub use shift::{MismatchReport, RejectedShift, ShiftProposal, ValidatedShift};
