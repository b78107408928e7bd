//! Ordered stage executor.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::context::ProcessingContext;
use super::stages::{OmrStage, StageMetrics};
use crate::core::errors::{OMRError, OmrResult};

/// An ordered, named list of stages run over one context per file.
#[derive(Debug, Clone, Default)]
pub struct OmrPipeline {
    stages: Vec<Arc<dyn OmrStage>>,
}

impl OmrPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn add_stage(&mut self, stage: Arc<dyn OmrStage>) {
        self.stages.push(stage);
    }

    /// Inserts `stage` before the stage named `before`.
    ///
    /// Returns an error when no stage has that name.
    pub fn insert_before(&mut self, before: &str, stage: Arc<dyn OmrStage>) -> OmrResult<()> {
        let index = self.position(before).ok_or_else(|| {
            OMRError::invalid_input(format!("no stage named '{before}' in pipeline"))
        })?;
        self.stages.insert(index, stage);
        Ok(())
    }

    /// Removes the stage named `name`, returning it if present.
    pub fn remove_stage(&mut self, name: &str) -> Option<Arc<dyn OmrStage>> {
        let index = self.position(name)?;
        Some(self.stages.remove(index))
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name() == name)
    }

    /// Runs every stage in order on `context`.
    ///
    /// A failing stage stops the run; the error is wrapped with the stage
    /// name and file path. Whatever the earlier stages wrote to `context`
    /// stays there.
    pub fn run(&self, context: &mut ProcessingContext) -> OmrResult<()> {
        debug!(file = %context.file_path, stages = self.stages.len(), "Starting pipeline");
        let start = Instant::now();

        for stage in &self.stages {
            let name = stage.name();
            if !stage.is_enabled(context) {
                debug!(stage = name, file = %context.file_path, "Stage skipped");
                context
                    .stage_metrics
                    .push((name.to_string(), StageMetrics::skipped()));
                continue;
            }

            debug!(stage = name, file = %context.file_path, "Stage started");
            let stage_start = Instant::now();
            match stage.process(context) {
                Ok(metrics) => {
                    let elapsed = stage_start.elapsed();
                    debug!(
                        stage = name,
                        file = %context.file_path,
                        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                        "Stage finished"
                    );
                    context
                        .stage_metrics
                        .push((name.to_string(), metrics.with_processing_time(elapsed)));
                }
                Err(error) => {
                    warn!(stage = name, file = %context.file_path, error = %error, "Stage failed");
                    return Err(OMRError::stage_error(name, context.file_path.clone(), error));
                }
            }
        }

        info!(
            file = %context.file_path,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Pipeline finished"
        );
        Ok(())
    }

    /// Runs the pipeline on a fresh context and returns it.
    pub fn process(&self, mut context: ProcessingContext) -> OmrResult<ProcessingContext> {
        self.run(&mut context)?;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::reader::test_support::template;
    use image::GrayImage;
    use std::sync::Mutex;

    /// Records its name into a shared log.
    #[derive(Debug)]
    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
        enabled: bool,
    }

    impl Recording {
        fn stage(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn OmrStage> {
            Arc::new(Self {
                name,
                log: Arc::clone(log),
                fail: false,
                enabled: true,
            })
        }
    }

    impl OmrStage for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn is_enabled(&self, _context: &ProcessingContext) -> bool {
            self.enabled
        }

        fn process(&self, context: &mut ProcessingContext) -> OmrResult<StageMetrics> {
            self.log.lock().unwrap().push(self.name);
            context.stats.threshold_fallbacks += 1;
            if self.fail {
                return Err(OMRError::invalid_input("boom"));
            }
            Ok(StageMetrics::new(1, 0))
        }
    }

    fn context() -> ProcessingContext {
        ProcessingContext::new("sheet.png", GrayImage::new(1, 1), Arc::new(template(1)))
    }

    #[test]
    fn test_stage_list_editing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = OmrPipeline::new();
        pipeline.add_stage(Recording::stage("preprocessing", &log));
        pipeline.add_stage(Recording::stage("detect", &log));
        pipeline
            .insert_before("detect", Recording::stage("shift", &log))
            .unwrap();
        assert!(pipeline.insert_before("missing", Recording::stage("x", &log)).is_err());
        assert_eq!(pipeline.stage_names(), vec!["preprocessing", "shift", "detect"]);

        assert!(pipeline.remove_stage("shift").is_some());
        assert!(pipeline.remove_stage("shift").is_none());
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_runs_in_order_and_skips_disabled() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = OmrPipeline::new();
        pipeline.add_stage(Recording::stage("a", &log));
        pipeline.add_stage(Arc::new(Recording {
            name: "b",
            log: Arc::clone(&log),
            fail: false,
            enabled: false,
        }));
        pipeline.add_stage(Recording::stage("c", &log));

        let context = pipeline.process(context()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
        assert_eq!(context.stage_metrics.len(), 3);
        assert!(context.stage_metrics[1].1.skipped);
        assert!(context.stage_metrics[0].1.processing_time.is_some());
    }

    #[test]
    fn test_failure_aborts_and_names_stage() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = OmrPipeline::new();
        pipeline.add_stage(Recording::stage("a", &log));
        pipeline.add_stage(Arc::new(Recording {
            name: "b",
            log: Arc::clone(&log),
            fail: true,
            enabled: true,
        }));
        pipeline.add_stage(Recording::stage("c", &log));

        let mut context = context();
        let err = pipeline.run(&mut context).unwrap_err();
        assert_eq!(err.stage_name(), Some("b"));
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
        // Counters from the stages that ran are kept.
        assert_eq!(context.stats.threshold_fallbacks, 2);
    }
}
