//! Error types for the OMR engine.
//!
//! Statistical edge cases (too few samples, weak signal, unknown fusion
//! strategy, oversized shifts) never surface here: they degrade to a
//! documented fallback and bump a counter instead. What remains are
//! structural failures that callers must see.
//!
//! # Usage
//!
//! ```rust
//! use omrkit::core::errors::{OMRError, RepositoryError};
//!
//! let config_error = OMRError::config_error("confidence_reduction_min exceeds max");
//! let missing = OMRError::from(RepositoryError::NoActiveFile);
//! assert!(missing.to_string().contains("no active file"));
//! # let _ = config_error;
//! ```

pub mod constructors;
pub mod types;

pub use types::{OMRError, RepositoryError};

/// Convenient result alias for OMR operations.
pub type OmrResult<T> = Result<T, OMRError>;
