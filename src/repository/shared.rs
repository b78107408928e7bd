//! Thread-safe handle to a [`DetectionRepository`].

use std::sync::{Arc, Mutex, MutexGuard};

use super::store::{DetectionRepository, StoredResult};
use crate::core::errors::OmrResult;

/// A repository shared between worker threads.
///
/// All access goes through one mutex. Files are written with
/// [`SharedRepository::commit_file`], which holds the lock from `init_file`
/// to `finalize_file` so concurrent files never interleave.
#[derive(Debug, Clone, Default)]
pub struct SharedRepository {
    inner: Arc<Mutex<DetectionRepository>>,
}

impl SharedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DetectionRepository> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a new directory scope.
    pub fn init_directory(&self, directory: impl Into<String>) {
        self.lock().init_directory(directory);
    }

    /// Writes every record of a finished file in one critical section.
    ///
    /// Returns the number of field records stored for the file.
    pub fn commit_file<I>(&self, file_path: &str, records: I) -> OmrResult<usize>
    where
        I: IntoIterator<Item = (String, StoredResult)>,
    {
        let mut repo = self.lock();
        repo.init_file(file_path);
        for (field_id, result) in records {
            repo.save_field(&field_id, result)?;
        }
        Ok(repo.finalize_file()?)
    }

    /// Runs `f` with shared access to the repository.
    pub fn read<R>(&self, f: impl FnOnce(&DetectionRepository) -> R) -> R {
        f(&self.lock())
    }
}
