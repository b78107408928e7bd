//! Detection repository.
//!
//! A scoped store of per-field results: directory → file → field. A file
//! scope must be initialized before any write, and re-initializing the
//! directory clears every file scope.
//!
//! # Example
//!
//! ```
//! use omrkit::repository::DetectionRepository;
//! use omrkit::domain::FieldDetectionResult;
//!
//! let mut repo = DetectionRepository::new();
//! repo.init_directory("batch-1");
//! repo.init_file("sheet_01.png");
//! repo.save_field("q1", FieldDetectionResult::new("q1", "q1", vec![])).unwrap();
//! assert!(repo.get_field("q1").is_ok());
//! repo.finalize_file().unwrap();
//! assert!(repo.get_field("q1").is_err());
//! ```

pub mod shared;
pub mod store;

pub use shared::SharedRepository;
pub use store::{DetectionRepository, FieldRecord, StoredResult};
