//! Core error enums.

use thiserror::Error;

/// Errors raised by the detection repository.
///
/// These are programmer errors: the caller forgot to open a file scope or
/// asked for a field that was never written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A file-scoped operation ran before `init_file`.
    #[error("no active file: call init_file before reading or writing field results")]
    NoActiveFile,

    /// The requested field id has no record in the active file.
    #[error("field '{field_id}' not found in file '{file}'")]
    FieldNotFound {
        /// File scope that was searched.
        file: String,
        /// Missing field id.
        field_id: String,
    },
}

/// Enum representing the errors that can escape the OMR engine.
#[derive(Error, Debug)]
pub enum OMRError {
    /// Input that cannot be processed at all (as opposed to a weak signal).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Invalid configuration; fatal at construction time.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A structural validation failure (mismatched layouts, bad shapes).
    #[error("validation failed: {message}")]
    Validation {
        /// A message describing the failed check.
        message: String,
    },

    /// Repository misuse.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A pipeline stage failed for one file.
    #[error("stage '{stage}' failed for '{file}'")]
    Stage {
        /// Name of the failing stage.
        stage: String,
        /// File being processed.
        file: String,
        /// The underlying error.
        #[source]
        source: Box<OMRError>,
    },

    /// An external detector (ML model, sampler) reported a failure.
    #[error("detector '{detector}' failed")]
    Detector {
        /// Detector name.
        detector: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Image buffer error from the `image` crate.
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}

impl From<crate::core::config::ConfigError> for OMRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}
