//! Directory-level batch processing.
//!
//! Files of a directory run on a bounded rayon pool. Each file owns its
//! context; the only shared state is the repository and the run
//! statistics, both behind a single mutex. A file's records reach the
//! repository only after its whole pipeline succeeded.

use image::GrayImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::context::ProcessingContext;
use super::executor::OmrPipeline;
use super::stats::{PipelineStats, StatsManager};
use crate::core::config::TuningConfig;
use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use crate::core::errors::{OMRError, OmrResult};
use crate::domain::Template;
use crate::repository::{SharedRepository, StoredResult};

/// One input file: its path and decoded grayscale image.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub path: String,
    pub image: GrayImage,
}

impl FileInput {
    pub fn new(path: impl Into<String>, image: GrayImage) -> Self {
        Self {
            path: path.into(),
            image,
        }
    }
}

/// One input file still in its encoded (PNG) form.
#[derive(Debug, Clone)]
pub struct EncodedInput {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl EncodedInput {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Decodes the bytes into a grayscale [`FileInput`].
    ///
    /// # Errors
    ///
    /// Returns `OMRError::Image` when the bytes are not a supported image.
    pub fn decode(self) -> OmrResult<FileInput> {
        let image = image::load_from_memory(&self.bytes).map_err(|error| {
            warn!(file = %self.path, error = %error, "Failed to decode sheet");
            OMRError::from(error)
        })?;
        Ok(FileInput::new(self.path, image.to_luma8()))
    }
}

/// Whether a batch runs on the worker pool or on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStrategy {
    Sequential,
    Parallel,
    /// Parallel when more than the given number of files are queued.
    Auto(usize),
}

impl ProcessingStrategy {
    pub fn should_use_parallel(&self, item_count: usize) -> bool {
        match self {
            Self::Sequential => false,
            Self::Parallel => true,
            Self::Auto(threshold) => item_count > *threshold,
        }
    }
}

/// Runs a pipeline over every file of a directory.
#[derive(Debug)]
pub struct BatchProcessor {
    pipeline: Arc<OmrPipeline>,
    template: Arc<Template>,
    config: Arc<TuningConfig>,
    repository: SharedRepository,
    stats: Arc<StatsManager>,
}

impl BatchProcessor {
    pub fn new(pipeline: OmrPipeline, template: Arc<Template>, config: Arc<TuningConfig>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            template,
            config,
            repository: SharedRepository::default(),
            stats: Arc::new(StatsManager::new()),
        }
    }

    /// Uses an existing repository handle instead of a private one.
    pub fn with_repository(mut self, repository: SharedRepository) -> Self {
        self.repository = repository;
        self
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repository
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.get_stats()
    }

    pub fn pipeline(&self) -> &OmrPipeline {
        &self.pipeline
    }

    fn strategy(&self) -> ProcessingStrategy {
        if self.config.effective_workers() <= 1 {
            ProcessingStrategy::Sequential
        } else {
            ProcessingStrategy::Auto(DEFAULT_PARALLEL_THRESHOLD)
        }
    }

    /// Processes every input of directory `name`.
    ///
    /// The repository's directory scope is reset first. Results are returned
    /// in input order; a failed file yields its error without affecting the
    /// others.
    pub fn process_directory(
        &self,
        name: &str,
        inputs: Vec<FileInput>,
    ) -> OmrResult<Vec<OmrResult<ProcessingContext>>> {
        self.run_directory(name, inputs, Ok)
    }

    /// Processes encoded inputs of directory `name`, decoding each one on
    /// its worker. A file that fails to decode yields `OMRError::Image` and
    /// counts as failed.
    pub fn process_encoded_directory(
        &self,
        name: &str,
        inputs: Vec<EncodedInput>,
    ) -> OmrResult<Vec<OmrResult<ProcessingContext>>> {
        self.run_directory(name, inputs, EncodedInput::decode)
    }

    fn run_directory<I, F>(
        &self,
        name: &str,
        inputs: Vec<I>,
        load: F,
    ) -> OmrResult<Vec<OmrResult<ProcessingContext>>>
    where
        I: Send,
        F: Fn(I) -> OmrResult<FileInput> + Sync,
    {
        self.repository.init_directory(name);
        let total = inputs.len();
        info!(directory = name, files = total, "Processing directory");

        let indexed: Vec<(usize, I)> = inputs.into_iter().enumerate().collect();
        let mut results: Vec<(usize, OmrResult<ProcessingContext>)> =
            if self.strategy().should_use_parallel(total) {
                let workers = self.config.effective_workers();
                debug!(workers, "Using parallel processing");
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| OMRError::config_error(format!("failed to build worker pool: {e}")))?;
                pool.install(|| {
                    indexed
                        .into_par_iter()
                        .map(|(index, input)| (index, self.load_and_process(&load, input)))
                        .collect()
                })
            } else {
                debug!("Using sequential processing");
                indexed
                    .into_iter()
                    .map(|(index, input)| (index, self.load_and_process(&load, input)))
                    .collect()
            };
        results.sort_by_key(|(index, _)| *index);

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(
            directory = name,
            processed = total - failed,
            failed,
            "Directory complete"
        );
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }

    fn load_and_process<I, F>(&self, load: &F, input: I) -> OmrResult<ProcessingContext>
    where
        F: Fn(I) -> OmrResult<FileInput>,
    {
        match load(input) {
            Ok(input) => self.process_file(input),
            Err(error) => {
                self.stats.record_failure(&PipelineStats::default());
                Err(error)
            }
        }
    }

    /// Runs one file and commits its records on success.
    fn process_file(&self, input: FileInput) -> OmrResult<ProcessingContext> {
        let mut context = ProcessingContext::new(input.path, input.image, Arc::clone(&self.template));

        if let Err(error) = self.pipeline.run(&mut context) {
            warn!(file = %context.file_path, error = %error, "File failed");
            self.stats.record_failure(&context.stats);
            return Err(error);
        }

        let records = file_records(&context);
        if let Err(error) = self.repository.commit_file(&context.file_path, records) {
            self.stats.record_failure(&context.stats);
            return Err(error);
        }
        self.stats.record_success(&context.stats);
        Ok(context)
    }
}

/// Detection and final interpretation records of a finished file, keyed by
/// field id.
fn file_records(context: &ProcessingContext) -> Vec<(String, StoredResult)> {
    let mut records = Vec::new();
    if let Some(reading) = &context.reading {
        records.extend(
            reading
                .detections
                .iter()
                .map(|d| (d.field_id.clone(), StoredResult::from(d.clone()))),
        );
    }
    records.extend(
        context
            .interpretations
            .iter()
            .map(|i| (i.field_id.clone(), StoredResult::from(i.clone()))),
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProcessingConfig;
    use crate::interpretation::reader::test_support::{sheet, template};
    use crate::pipeline::OmrPipelineBuilder;
    use crate::pipeline::stages::{OmrStage, StageMetrics};

    /// Fails every file whose path contains "bad".
    #[derive(Debug)]
    struct RejectBad;

    impl OmrStage for RejectBad {
        fn name(&self) -> &str {
            "reject_bad"
        }

        fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
            if context.file_path.contains("bad") {
                return Err(OMRError::invalid_input("unreadable sheet"));
            }
            Ok(StageMetrics::default())
        }
    }

    fn processor(workers: usize) -> BatchProcessor {
        let config = Arc::new(TuningConfig {
            processing: ProcessingConfig {
                max_parallel_workers: workers,
            },
            ..Default::default()
        });
        let mut pipeline = OmrPipelineBuilder::new(Arc::clone(&config)).build().unwrap();
        pipeline
            .insert_before("detection_interpretation", Arc::new(RejectBad))
            .unwrap();
        BatchProcessor::new(pipeline, Arc::new(template(2)), config)
    }

    fn inputs() -> Vec<FileInput> {
        let layout = template(2);
        vec![
            FileInput::new("dir/1.png", sheet(&layout, &[(0, 0), (1, 1)], (0, 0))),
            FileInput::new("dir/bad.png", sheet(&layout, &[], (0, 0))),
            FileInput::new("dir/3.png", sheet(&layout, &[(0, 2), (1, 3)], (0, 0))),
            FileInput::new("dir/4.png", sheet(&layout, &[(0, 3), (1, 0)], (0, 0))),
        ]
    }

    fn check(processor: &BatchProcessor, results: &[OmrResult<ProcessingContext>]) {
        assert_eq!(results.len(), 4);
        let responses: Vec<Option<String>> = results
            .iter()
            .map(|r| r.as_ref().ok().map(|c| format!("{}{}", c.response_map["q1"], c.response_map["q2"])))
            .collect();
        assert_eq!(
            responses,
            vec![Some("AB".into()), None, Some("CD".into()), Some("DA".into())]
        );
        assert_eq!(
            results[1].as_ref().unwrap_err().stage_name(),
            Some("reject_bad")
        );

        let stats = processor.stats();
        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.files_failed, 1);

        processor.repository().read(|repo| {
            assert_eq!(repo.finalized_files().len(), 3);
            assert!(repo.get_field_in("dir/bad.png", "q1").is_err());
            let record = repo.get_field_in("dir/3.png", "q2").unwrap();
            assert_eq!(record.interpretation.as_ref().unwrap().response, "D");
            assert!(record.detection.is_some());
        });
    }

    #[test]
    fn test_sequential_directory() {
        let processor = processor(1);
        let results = processor.process_directory("dir", inputs()).unwrap();
        check(&processor, &results);
    }

    #[test]
    fn test_parallel_directory_matches_sequential() {
        let processor = processor(3);
        let results = processor.process_directory("dir", inputs()).unwrap();
        check(&processor, &results);
    }

    #[test]
    fn test_new_directory_clears_previous_files() {
        let processor = processor(1);
        processor.process_directory("first", inputs()).unwrap();
        processor
            .process_directory("second", inputs().into_iter().take(1).collect())
            .unwrap();
        processor.repository().read(|repo| {
            assert_eq!(repo.directory(), Some("second"));
            assert_eq!(repo.finalized_files().len(), 1);
        });
        assert_eq!(processor.stats().files_processed, 4);
    }

    #[test]
    fn test_shared_repository_sees_commits() {
        let shared = SharedRepository::new();
        let processor = processor(1).with_repository(shared.clone());
        processor
            .process_directory("dir", inputs().into_iter().take(1).collect())
            .unwrap();
        shared.read(|repo| {
            assert_eq!(repo.finalized_files(), ["dir/1.png".to_string()]);
            assert!(repo.get_field_in("dir/1.png", "q2").is_ok());
        });
    }

    fn png_bytes(image: &GrayImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_encoded_directory_reports_decode_failures() {
        let processor = processor(2);
        let layout = template(2);
        let encoded = vec![
            EncodedInput::new("dir/1.png", png_bytes(&sheet(&layout, &[(0, 0), (1, 1)], (0, 0)))),
            EncodedInput::new("dir/torn.png", b"not an image".to_vec()),
            EncodedInput::new("dir/3.png", png_bytes(&sheet(&layout, &[(0, 2), (1, 3)], (0, 0)))),
        ];

        let results = processor.process_encoded_directory("dir", encoded).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().response_map["q2"], "B");
        assert!(matches!(results[1], Err(OMRError::Image(_))));
        assert_eq!(results[2].as_ref().unwrap().response_map["q1"], "C");

        let stats = processor.stats();
        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        processor
            .repository()
            .read(|repo| assert_eq!(repo.finalized_files().len(), 2));
    }

    #[test]
    fn test_strategy_thresholds() {
        assert!(!ProcessingStrategy::Sequential.should_use_parallel(100));
        assert!(ProcessingStrategy::Parallel.should_use_parallel(1));
        assert!(ProcessingStrategy::Auto(2).should_use_parallel(3));
        assert!(!ProcessingStrategy::Auto(2).should_use_parallel(2));
    }
}
