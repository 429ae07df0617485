// Batch metrics module
//
// Counts what happened to the replays of a batch and how long processing took

use crate::services::ProcessOutcome;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Per-batch processing metrics
///
/// Uses atomic operations so every job can record its result without locks.
/// A fresh instance is created for each batch.
#[derive(Debug)]
pub struct BatchMetrics {
    /// Replays muxed with their microphone track
    pub replays_merged: AtomicUsize,

    /// Replays without a microphone track copied to the output folder
    pub replays_copied: AtomicUsize,

    /// Replays without a microphone track left in place (replace mode)
    pub replays_untouched: AtomicUsize,

    /// Replays whose job failed
    pub replays_failed: AtomicUsize,

    /// Replays whose job was cancelled
    pub replays_cancelled: AtomicUsize,

    /// Summed time spent inside the processor, in milliseconds
    pub total_processing_time_ms: AtomicU64,

    /// Batch start time
    start_time: Instant,
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            replays_merged: AtomicUsize::new(0),
            replays_copied: AtomicUsize::new(0),
            replays_untouched: AtomicUsize::new(0),
            replays_failed: AtomicUsize::new(0),
            replays_cancelled: AtomicUsize::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful replay
    pub fn record_outcome(&self, outcome: ProcessOutcome) {
        let counter = match outcome {
            ProcessOutcome::Merged => &self.replays_merged,
            ProcessOutcome::Copied => &self.replays_copied,
            ProcessOutcome::Untouched => &self.replays_untouched,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.replays_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.replays_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_time(&self, duration: Duration) {
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Wall time since the batch started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn succeeded(&self) -> usize {
        self.replays_merged.load(Ordering::Relaxed)
            + self.replays_copied.load(Ordering::Relaxed)
            + self.replays_untouched.load(Ordering::Relaxed)
    }

    /// Average processing time per finished replay in milliseconds
    pub fn avg_processing_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let count = self.succeeded() + self.replays_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!(
            "Replays: {} merged, {} copied, {} untouched, {} failed, {} cancelled",
            self.replays_merged.load(Ordering::Relaxed),
            self.replays_copied.load(Ordering::Relaxed),
            self.replays_untouched.load(Ordering::Relaxed),
            self.replays_failed.load(Ordering::Relaxed),
            self.replays_cancelled.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Processing time: {:.2}s total (avg: {:.2}ms per replay), wall time {:.2}s",
            self.total_processing_time_ms.load(Ordering::Relaxed) as f64 / 1000.0,
            self.avg_processing_time_ms(),
            self.elapsed().as_secs_f64()
        );
    }
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
