//! Run-wide statistics helpers.
//!
//! This module defines the `PipelineStats` counters collected for every file
//! and the `StatsManager` helper that merges them across worker threads.
//! Every counter is a plain sum, so the totals do not depend on the order in
//! which files finish.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Counters for a file or a whole run.
///
/// Every fallback, rejection and discrepancy the engine takes is counted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Files whose pipeline completed.
    pub files_processed: usize,
    /// Files aborted by a failing stage.
    pub files_failed: usize,
    /// Fields whose threshold fell back to a file or default value.
    pub threshold_fallbacks: usize,
    /// Files whose page-level threshold fell back to the configured default
    /// or found no confident gap.
    pub file_threshold_fallbacks: usize,
    pub multi_marked_fields: usize,
    pub shifts_accepted: usize,
    pub shifts_rejected: usize,
    /// Items whose decision changed under an applied shift.
    pub shift_bubble_mismatches: usize,
    /// Fields whose response changed under an applied shift.
    pub shift_field_mismatches: usize,
    pub files_requiring_review: usize,
    /// Sum of all confidence reductions applied after shift mismatches.
    pub confidence_reduction_total: f64,
    pub confidence_reductions: usize,
    pub fusion_discrepancies: usize,
    /// Fields whose fused reading came from the ML detector.
    pub ml_overrides: usize,
    pub unknown_strategy_fallbacks: usize,
    pub training_fields_collected: usize,
    pub training_fields_skipped: usize,
}

impl PipelineStats {
    /// Creates a new PipelineStats instance with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every counter of `other` to `self`.
    pub fn merge(&mut self, other: &PipelineStats) {
        self.files_processed += other.files_processed;
        self.files_failed += other.files_failed;
        self.threshold_fallbacks += other.threshold_fallbacks;
        self.file_threshold_fallbacks += other.file_threshold_fallbacks;
        self.multi_marked_fields += other.multi_marked_fields;
        self.shifts_accepted += other.shifts_accepted;
        self.shifts_rejected += other.shifts_rejected;
        self.shift_bubble_mismatches += other.shift_bubble_mismatches;
        self.shift_field_mismatches += other.shift_field_mismatches;
        self.files_requiring_review += other.files_requiring_review;
        self.confidence_reduction_total += other.confidence_reduction_total;
        self.confidence_reductions += other.confidence_reductions;
        self.fusion_discrepancies += other.fusion_discrepancies;
        self.ml_overrides += other.ml_overrides;
        self.unknown_strategy_fallbacks += other.unknown_strategy_fallbacks;
        self.training_fields_collected += other.training_fields_collected;
        self.training_fields_skipped += other.training_fields_skipped;
    }

    pub fn total_files(&self) -> usize {
        self.files_processed + self.files_failed
    }

    /// Returns the success rate as a percentage (0.0 to 100.0).
    pub fn success_rate(&self) -> f64 {
        let total = self.total_files();
        if total == 0 {
            0.0
        } else {
            (self.files_processed as f64 / total as f64) * 100.0
        }
    }

    /// Mean confidence reduction per reduced field.
    pub fn average_confidence_reduction(&self) -> f64 {
        if self.confidence_reductions == 0 {
            0.0
        } else {
            self.confidence_reduction_total / self.confidence_reductions as f64
        }
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Statistics:")?;
        writeln!(
            f,
            "  Files: {} processed, {} failed ({:.1}% success)",
            self.files_processed,
            self.files_failed,
            self.success_rate()
        )?;
        writeln!(
            f,
            "  Threshold fallbacks: {} fields, {} files",
            self.threshold_fallbacks, self.file_threshold_fallbacks
        )?;
        writeln!(f, "  Multi-marked fields: {}", self.multi_marked_fields)?;
        writeln!(
            f,
            "  Shifts: {} accepted, {} rejected",
            self.shifts_accepted, self.shifts_rejected
        )?;
        writeln!(
            f,
            "  Shift mismatches: {} bubbles, {} fields, {} files for review",
            self.shift_bubble_mismatches, self.shift_field_mismatches, self.files_requiring_review
        )?;
        writeln!(
            f,
            "  Confidence reductions: {} (avg {:.3})",
            self.confidence_reductions,
            self.average_confidence_reduction()
        )?;
        writeln!(
            f,
            "  Fusion: {} discrepancies, {} ML overrides, {} strategy fallbacks",
            self.fusion_discrepancies, self.ml_overrides, self.unknown_strategy_fallbacks
        )?;
        writeln!(
            f,
            "  Training fields: {} collected, {} skipped",
            self.training_fields_collected, self.training_fields_skipped
        )?;
        Ok(())
    }
}

/// Thread-safe manager for merging statistics from parallel workers.
#[derive(Debug, Default)]
pub struct StatsManager {
    /// Shared statistics state guarded by a mutex.
    stats: Mutex<PipelineStats>,
}

impl StatsManager {
    /// Creates a new `StatsManager` instance with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PipelineStats> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a copy of the current statistics snapshot.
    pub fn get_stats(&self) -> PipelineStats {
        self.lock().clone()
    }

    /// Adds the counters of a completed file.
    pub fn record_success(&self, file_stats: &PipelineStats) {
        let mut stats = self.lock();
        stats.merge(file_stats);
        stats.files_processed += 1;
    }

    /// Adds the counters gathered before a file failed.
    pub fn record_failure(&self, partial: &PipelineStats) {
        let mut stats = self.lock();
        stats.merge(partial);
        stats.files_failed += 1;
    }

    /// Resets the tracked statistics to their default state.
    pub fn reset_stats(&self) {
        *self.lock() = PipelineStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStats, StatsManager};
    use std::sync::Arc;
    use std::thread;

    fn file_stats(seed: usize) -> PipelineStats {
        PipelineStats {
            threshold_fallbacks: seed,
            file_threshold_fallbacks: seed % 2,
            shifts_rejected: seed * 2,
            confidence_reduction_total: 0.25 * seed as f64,
            confidence_reductions: seed,
            ml_overrides: 1,
            ..Default::default()
        }
    }

    #[test]
    fn success_rate_handles_zero_files() {
        assert_eq!(PipelineStats::default().success_rate(), 0.0);
        assert_eq!(PipelineStats::default().average_confidence_reduction(), 0.0);
    }

    #[test]
    fn merge_is_order_independent() {
        let parts = [file_stats(1), file_stats(2), file_stats(3)];

        let mut forward = PipelineStats::new();
        parts.iter().for_each(|p| forward.merge(p));
        let mut backward = PipelineStats::new();
        parts.iter().rev().for_each(|p| backward.merge(p));

        assert_eq!(forward, backward);
        assert_eq!(forward.threshold_fallbacks, 6);
        assert_eq!(forward.file_threshold_fallbacks, 2);
        assert_eq!(forward.shifts_rejected, 12);
        assert!((forward.average_confidence_reduction() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn stats_manager_counts_outcomes() {
        let manager = StatsManager::new();
        manager.record_success(&file_stats(1));
        manager.record_failure(&file_stats(2));

        let stats = manager.get_stats();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.threshold_fallbacks, 3);
        assert_eq!(stats.file_threshold_fallbacks, 1);
        assert_eq!(stats.success_rate(), 50.0);

        manager.reset_stats();
        assert_eq!(manager.get_stats(), PipelineStats::default());
    }

    #[test]
    fn stats_manager_is_shared_across_threads() {
        let manager = Arc::new(StatsManager::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || manager.record_success(&file_stats(1)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = manager.get_stats();
        assert_eq!(stats.files_processed, 8);
        assert_eq!(stats.ml_overrides, 8);
    }

    #[test]
    fn display_formats_counters() {
        let stats = PipelineStats {
            files_processed: 3,
            files_failed: 1,
            shifts_accepted: 2,
            file_threshold_fallbacks: 1,
            ..Default::default()
        };
        let display = stats.to_string();
        assert!(display.contains("Pipeline Statistics:"));
        assert!(display.contains("3 processed, 1 failed (75.0% success)"));
        assert!(display.contains("Shifts: 2 accepted, 0 rejected"));
        assert!(display.contains("Threshold fallbacks: 0 fields, 1 files"));
    }
}
