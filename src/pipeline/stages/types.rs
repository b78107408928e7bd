//! Shared types for pipeline stages.

use std::collections::HashMap;
use std::time::Duration;

/// Metrics collected for one stage run.
///
/// This provides consistent timing and outcome tracking across all stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageMetrics {
    /// Time taken to process the stage
    pub processing_time: Option<Duration>,
    /// Whether the stage was skipped because it was not enabled
    pub skipped: bool,
    /// Number of items successfully processed
    pub success_count: usize,
    /// Number of items that failed processing
    pub failure_count: usize,
    /// Additional stage-specific metrics
    pub additional_info: HashMap<String, String>,
}

impl StageMetrics {
    /// Create new metrics with the given counts
    pub fn new(success_count: usize, failure_count: usize) -> Self {
        Self {
            success_count,
            failure_count,
            ..Default::default()
        }
    }

    /// Metrics for a stage that did not run.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }

    /// Set the processing time
    pub fn with_processing_time(mut self, duration: Duration) -> Self {
        self.processing_time = Some(duration);
        self
    }

    /// Add additional information to the metrics
    pub fn with_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }

    /// Get the total number of items processed
    pub fn total_count(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Get the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            0.0
        } else {
            (self.success_count as f64 / total as f64) * 100.0
        }
    }
}
