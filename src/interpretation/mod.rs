//! Field interpretation.
//!
//! Turns per-field intensity samples into marked/unmarked decisions, a
//! response string and a confidence score:
//!
//! 1. [`FileThresholds`] computes the page-level fallback and outlier
//!    thresholds from every field of a file.
//! 2. [`FieldInterpreter`] thresholds each field locally, falling back to the
//!    page threshold when the field's own gap is weak.
//! 3. [`TemplateReader`] runs sampling and both steps over a whole template.

pub mod file_thresholds;
pub mod interpreter;
pub mod reader;

pub use file_thresholds::FileThresholds;
pub use interpreter::FieldInterpreter;
pub use reader::{FieldConfidenceReport, TemplateReader, TemplateReading};
