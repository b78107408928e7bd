//! Scoped store of per-field results.
//!
//! Three scopes: a directory holds files, a file holds fields. Records live
//! in one arena indexed by `(file_path, field_id)`. The file being written
//! always occupies the tail of the arena, so abandoning it is a truncation.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::core::errors::RepositoryError;
use crate::domain::{FieldDetectionResult, FieldInterpretation, IntensitySample};

/// A result that can be saved for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StoredResult {
    Detection(FieldDetectionResult),
    Interpretation(FieldInterpretation),
}

impl From<FieldDetectionResult> for StoredResult {
    fn from(result: FieldDetectionResult) -> Self {
        Self::Detection(result)
    }
}

impl From<FieldInterpretation> for StoredResult {
    fn from(result: FieldInterpretation) -> Self {
        Self::Interpretation(result)
    }
}

/// Everything saved for one field of one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    pub file_path: String,
    pub field_id: String,
    pub detection: Option<FieldDetectionResult>,
    pub interpretation: Option<FieldInterpretation>,
}

impl FieldRecord {
    fn new(file_path: &str, field_id: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            field_id: field_id.to_string(),
            detection: None,
            interpretation: None,
        }
    }

    fn store(&mut self, result: StoredResult) {
        match result {
            StoredResult::Detection(d) => self.detection = Some(d),
            StoredResult::Interpretation(i) => self.interpretation = Some(i),
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveFile {
    path: String,
    /// Arena index of the file's first record.
    start: usize,
}

/// Per-directory, per-file, per-field result store.
#[derive(Debug, Default)]
pub struct DetectionRepository {
    directory: Option<String>,
    records: Vec<FieldRecord>,
    index: HashMap<(String, String), usize>,
    /// Finalized files in completion order.
    finalized: Vec<String>,
    active: Option<ActiveFile>,
}

impl DetectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a directory scope, dropping every file of the previous one.
    pub fn init_directory(&mut self, directory: impl Into<String>) {
        let directory = directory.into();
        debug!(
            directory = %directory,
            dropped_files = self.finalized.len(),
            "Initializing directory scope"
        );
        self.records.clear();
        self.index.clear();
        self.finalized.clear();
        self.active = None;
        self.directory = Some(directory);
    }

    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    /// Starts a file scope.
    ///
    /// An unfinalized previous file is discarded. Re-initializing a finalized
    /// path replaces its records.
    pub fn init_file(&mut self, file_path: impl Into<String>) {
        let file_path = file_path.into();
        self.discard_active();

        if self.finalized.iter().any(|f| *f == file_path) {
            warn!(file = %file_path, "Replacing results of an already finalized file");
            self.finalized.retain(|f| *f != file_path);
            self.records.retain(|r| r.file_path != file_path);
            self.rebuild_index();
        }

        self.active = Some(ActiveFile {
            path: file_path,
            start: self.records.len(),
        });
    }

    /// Path of the file currently being written.
    pub fn current_file(&self) -> Result<&str, RepositoryError> {
        self.active
            .as_ref()
            .map(|a| a.path.as_str())
            .ok_or(RepositoryError::NoActiveFile)
    }

    /// Saves a result for `field_id` in the current file.
    ///
    /// Saving a detection and an interpretation for the same field fills one
    /// record; saving the same kind twice replaces it.
    pub fn save_field(
        &mut self,
        field_id: &str,
        result: impl Into<StoredResult>,
    ) -> Result<(), RepositoryError> {
        let active = self.active.as_ref().ok_or(RepositoryError::NoActiveFile)?;
        let key = (active.path.clone(), field_id.to_string());
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.records.push(FieldRecord::new(&active.path, field_id));
                let idx = self.records.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };
        self.records[idx].store(result.into());
        Ok(())
    }

    /// Looks up a field of the current file.
    pub fn get_field(&self, field_id: &str) -> Result<&FieldRecord, RepositoryError> {
        let path = self.current_file()?;
        self.lookup(path, field_id)
    }

    /// Looks up a field of any file in the directory, finalized or current.
    pub fn get_field_in(&self, file_path: &str, field_id: &str) -> Result<&FieldRecord, RepositoryError> {
        self.lookup(file_path, field_id)
    }

    /// Closes the current file scope; its records become part of the directory.
    ///
    /// Returns the number of fields stored for the file.
    pub fn finalize_file(&mut self) -> Result<usize, RepositoryError> {
        let active = self.active.take().ok_or(RepositoryError::NoActiveFile)?;
        let count = self.records.len() - active.start;
        debug!(file = %active.path, fields = count, "Finalized file");
        self.finalized.push(active.path);
        Ok(count)
    }

    /// Every sample saved for the current file, in save order.
    pub fn all_samples_for_current_file(&self) -> Result<Vec<&IntensitySample>, RepositoryError> {
        let active = self.active.as_ref().ok_or(RepositoryError::NoActiveFile)?;
        Ok(self.records[active.start..]
            .iter()
            .filter_map(|r| r.detection.as_ref())
            .flat_map(|d| d.samples.iter())
            .collect())
    }

    /// Records of every finalized file, keyed by file path.
    pub fn all_results_for_directory(&self) -> BTreeMap<&str, Vec<&FieldRecord>> {
        let end = self.active.as_ref().map_or(self.records.len(), |a| a.start);
        let mut results: BTreeMap<&str, Vec<&FieldRecord>> = BTreeMap::new();
        for record in &self.records[..end] {
            results
                .entry(record.file_path.as_str())
                .or_default()
                .push(record);
        }
        results
    }

    /// Finalized file paths in completion order.
    pub fn finalized_files(&self) -> &[String] {
        &self.finalized
    }

    /// Total number of field records, including the current file's.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn lookup(&self, file_path: &str, field_id: &str) -> Result<&FieldRecord, RepositoryError> {
        self.index
            .get(&(file_path.to_string(), field_id.to_string()))
            .map(|&idx| &self.records[idx])
            .ok_or_else(|| RepositoryError::FieldNotFound {
                file: file_path.to_string(),
                field_id: field_id.to_string(),
            })
    }

    fn discard_active(&mut self) {
        if let Some(active) = self.active.take() {
            let dropped = self.records.len() - active.start;
            if dropped > 0 {
                warn!(file = %active.path, fields = dropped, "Discarding unfinalized file");
            }
            for record in self.records.drain(active.start..) {
                self.index.remove(&(record.file_path, record.field_id));
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(idx, r)| ((r.file_path.clone(), r.field_id.clone()), idx))
            .collect();
    }
}
