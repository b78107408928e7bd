//! Shift validation.
//!
//! Block shift proposals (usually from an ML block detector) are checked
//! against per-block margins, applied to a copy of the template and
//! cross-checked against an unshifted reading. Disagreements lower the
//! confidence of the affected fields and may flag the file for review.

pub mod report;
pub mod validator;

pub use report::{
    AppliedShifts, ComparisonReport, ConfidenceReduction, FieldMismatch, ShiftOutcome,
    ShiftValidation,
};
pub use validator::ShiftValidator;
