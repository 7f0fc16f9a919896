//! Statistics tracking for record extraction
//!
//! This module provides counters collected while writing ground-truth and
//! detection-record files, so a run can report what was kept and what was
//! dropped along the way.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Statistics collected while writing one kind of record file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Number of images whose record file was written
    pub images_processed: usize,

    /// Number of record lines written
    pub records_written: usize,

    /// Number of written records marked difficult
    pub difficult_records: usize,

    /// Number of objects/boxes skipped because their class is not in the class list
    pub skipped_unknown_class: usize,

    /// Number of boxes dropped by the confidence threshold
    pub skipped_low_confidence: usize,

    /// Number of boxes removed by non-maximum suppression
    pub suppressed: usize,

    /// Number of boxes dropped by the per-image box cap
    pub truncated: usize,

    /// Number of images whose record file is empty
    pub empty_images: usize,
}

impl ExtractionStats {
    /// Create a new `ExtractionStats` with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one written line
    pub fn add_record(&mut self, difficult: bool) {
        self.records_written += 1;
        if difficult {
            self.difficult_records += 1;
        }
    }

    /// Record an object skipped because its class is not evaluated
    pub fn skip_unknown_class(&mut self) {
        self.skipped_unknown_class += 1;
    }

    /// Record a finished image and whether it produced any line
    pub fn finish_image(&mut self, records: usize) {
        self.images_processed += 1;
        if records == 0 {
            self.empty_images += 1;
        }
    }

    /// Calculate the total number of dropped objects/boxes
    pub fn total_skipped(&self) -> usize {
        self.skipped_unknown_class + self.skipped_low_confidence + self.suppressed + self.truncated
    }

    /// Emit a summary of the statistics as a log event
    pub fn log_summary(&self, step: &str) {
        info!(
            step,
            images = self.images_processed,
            records = self.records_written,
            difficult = self.difficult_records,
            skipped = self.total_skipped(),
            empty_images = self.empty_images,
            "extraction finished"
        );
    }
}

/// Periodic progress reporting for a per-image loop
#[derive(Debug)]
pub struct Progress {
    step: &'static str,
    total: usize,
    every: usize,
    started: Instant,
}

impl Progress {
    /// Start tracking `total` images, reporting every `every` images
    pub fn new(step: &'static str, total: usize, every: usize) -> Self {
        Self {
            step,
            total,
            every: every.max(1),
            started: Instant::now(),
        }
    }

    /// Whether a report is due after `done` images
    pub fn is_due(&self, done: usize) -> bool {
        done > 0 && (done % self.every == 0 || done == self.total)
    }

    /// Report progress after `done` images have been handled
    pub fn tick(&self, done: usize) {
        if !self.is_due(done) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f32();
        let rate = if elapsed > 0.0 { done as f32 / elapsed } else { 0.0 };
        info!(
            step = self.step,
            "[{}/{}] processed ({:.1} img/s)",
            done,
            self.total,
            rate
        );
    }
}
