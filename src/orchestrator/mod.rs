//! Batch orchestration: one concurrent job per replay.
//!
//! [`ProcessingOrchestrator::run`] registers every replay of a session with a
//! [`JobRegistry`], spawns one tokio task per replay into a `JoinSet` and starts a
//! completion watcher. The returned [`BatchHandle`] cancels the batch and waits for
//! its [`BatchSummary`].
//!
//! # Event Guarantees
//!
//! For every job the [`StatusListener`] sees exactly one `Queued` event followed by
//! exactly one terminal event (`Succeeded`, `Failed` or `Cancelled`). There is no
//! ordering between jobs. `Running` is tracked in the registry only.
//!
//! # Cancellation
//!
//! Cancellation is cooperative. Jobs check the cancellation flag when they start and
//! again right before launching ffmpeg or copying; after that point a job runs to
//! completion and reports its real outcome. The watcher waits at most the configured
//! grace period for such jobs (or until [`BatchHandle::force`]), then aborts them.
//! Aborting kills their ffmpeg process and removes its partial output, and the
//! jobs are reported as cancelled.

mod session;

pub use session::{SessionError, prepare_session, remove_merged_replays, resolve_output_folder};

use crate::metrics::BatchMetrics;
use crate::models::{JobState, JobStatus, ProcessingSession, ReplayFile, ReplayId};
use crate::services::{Muxer, ReplayProcessor};
use crate::state::JobRegistry;
use camino::Utf8Path;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Default time the watcher waits for in-flight jobs after cancellation.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Receives job status events and the final batch summary.
///
/// Called from job tasks, so implementations must be cheap and thread-safe.
/// Any `Fn(&JobStatus)` closure is a listener.
pub trait StatusListener: Send + Sync + 'static {
    fn on_status(&self, status: &JobStatus);

    /// Called once when the batch has ended, normally or through cancellation.
    fn on_finished(&self, _summary: &BatchSummary) {}
}

impl<F> StatusListener for F
where
    F: Fn(&JobStatus) + Send + Sync + 'static,
{
    fn on_status(&self, status: &JobStatus) {
        self(status)
    }
}

/// Side effect run after a batch completed without cancellation,
/// when the user asked to open the output afterwards.
pub trait CompletionHook: Send + Sync {
    fn on_completed(&self, output_folder: &Utf8Path);
}

/// Final result of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled_jobs: usize,
    pub merged: usize,
    pub copied: usize,
    pub untouched: usize,
    pub elapsed: Duration,
    /// Whether the batch was cancelled
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            write!(
                f,
                "Replay processing stopped ({} of {} replays finished before cancellation)",
                self.succeeded + self.failed,
                self.total
            )
        } else {
            write!(
                f,
                "Done! Processed {} replays ({} merged, {} copied, {} untouched, {} failed) \
                 in {:.1} seconds",
                self.total,
                self.merged,
                self.copied,
                self.untouched,
                self.failed,
                self.elapsed.as_secs_f64()
            )
        }
    }
}

/// Runs a session's replays concurrently through a [`ReplayProcessor`].
///
/// Every replay gets its own task as soon as the batch starts; there is no cap
/// on the number of simultaneous ffmpeg processes.
pub struct ProcessingOrchestrator<M> {
    processor: Arc<ReplayProcessor<M>>,
    cancel_grace: Duration,
    completion_hook: Option<Arc<dyn CompletionHook>>,
}

impl<M: Muxer> ProcessingOrchestrator<M> {
    pub fn new(processor: ReplayProcessor<M>) -> Self {
        Self {
            processor: Arc::new(processor),
            cancel_grace: DEFAULT_CANCEL_GRACE,
            completion_hook: None,
        }
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_completion_hook(mut self, hook: impl CompletionHook + 'static) -> Self {
        self.completion_hook = Some(Arc::new(hook));
        self
    }

    /// Start processing `session`.
    ///
    /// Must be called from within a tokio runtime. Returns immediately; results
    /// arrive through `listener` and [`BatchHandle::wait`].
    pub fn run<L: StatusListener>(&self, session: ProcessingSession, listener: L) -> BatchHandle {
        let session = Arc::new(session);
        let listener: Arc<dyn StatusListener> = Arc::new(listener);
        let registry = JobRegistry::new();
        let metrics = Arc::new(BatchMetrics::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (force_tx, force_rx) = watch::channel(false);

        tracing::info!("Processing {} file(s)", session.file_count());
        tracing::info!("Output folder is: {}", session.output_folder);

        let mut jobs = JoinSet::new();
        for file in &session.files {
            let queued = registry.register(file);
            listener.on_status(&queued);

            let job = Job {
                file: file.clone(),
                session: Arc::clone(&session),
                processor: Arc::clone(&self.processor),
                cancel_rx: cancel_rx.clone(),
                guard: JobGuard {
                    id: file.id,
                    registry: registry.clone(),
                    listener: Arc::clone(&listener),
                    metrics: Arc::clone(&metrics),
                    finished: false,
                },
            };
            jobs.spawn(job.run());
        }

        let watcher = CompletionWatcher {
            session,
            registry: registry.clone(),
            metrics: Arc::clone(&metrics),
            listener,
            cancel_rx,
            force_rx,
            cancel_grace: self.cancel_grace,
            completion_hook: self.completion_hook.clone(),
        };
        let watcher = tokio::spawn(watcher.run(jobs));

        BatchHandle {
            canceller: BatchCanceller {
                cancel_tx: Arc::new(cancel_tx),
                force_tx: Arc::new(force_tx),
                registry,
            },
            metrics,
            watcher,
        }
    }
}

/// Cancels a batch; cheap to clone and hand to signal handlers.
#[derive(Clone)]
pub struct BatchCanceller {
    cancel_tx: Arc<watch::Sender<bool>>,
    force_tx: Arc<watch::Sender<bool>>,
    registry: JobRegistry,
}

impl BatchCanceller {
    /// Request cancellation of the whole batch. Calling it again has no effect.
    pub fn cancel(&self) {
        if self.registry.mark_cancelled() {
            tracing::info!("Cancelling replay processing...");
        }
        self.cancel_tx.send_replace(true);
    }

    /// Cancel and stop in-flight replays now instead of after the grace period.
    pub fn force(&self) {
        self.cancel();
        if !self.force_tx.send_replace(true) {
            tracing::warn!("Stopping in-flight replays without waiting");
        }
    }
}

/// Control handle for a running batch
pub struct BatchHandle {
    canceller: BatchCanceller,
    metrics: Arc<BatchMetrics>,
    watcher: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Request cancellation of the whole batch. Calling it again has no effect.
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// Cancel without waiting out the grace period for in-flight replays.
    pub fn force(&self) {
        self.canceller.force();
    }

    pub fn canceller(&self) -> BatchCanceller {
        self.canceller.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.registry.is_cancelled()
    }

    /// Live view of the job states
    pub fn registry(&self) -> &JobRegistry {
        &self.canceller.registry
    }

    pub fn metrics(&self) -> &BatchMetrics {
        &self.metrics
    }

    /// True once the completion watcher has produced the summary.
    pub fn is_finished(&self) -> bool {
        self.watcher.is_finished()
    }

    /// Wait for the batch to end and return its summary.
    pub async fn wait(self) -> Result<BatchSummary, JoinError> {
        self.watcher.await
    }
}

/// Reports a job's terminal state exactly once, even if the task is aborted or panics.
struct JobGuard {
    id: ReplayId,
    registry: JobRegistry,
    listener: Arc<dyn StatusListener>,
    metrics: Arc<BatchMetrics>,
    finished: bool,
}

impl JobGuard {
    fn finish(&mut self, state: JobState) {
        self.finished = true;
        if let Some(status) = self.registry.transition(self.id, state) {
            if state == JobState::Cancelled {
                self.metrics.record_cancelled();
            }
            self.listener.on_status(&status);
        }
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        if std::thread::panicking() {
            tracing::error!("Job {} panicked", self.id);
            self.metrics.record_failed();
            self.finish(JobState::Failed);
        } else {
            tracing::warn!("Job {} stopped before finishing, marking cancelled", self.id);
            self.finish(JobState::Cancelled);
        }
    }
}

struct Job<M> {
    file: ReplayFile,
    session: Arc<ProcessingSession>,
    processor: Arc<ReplayProcessor<M>>,
    cancel_rx: watch::Receiver<bool>,
    guard: JobGuard,
}

impl<M: Muxer> Job<M> {
    fn cancel_requested(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    async fn run(mut self) {
        let id = self.file.id;
        let name = self.file.file_name().to_string();

        // CANCELLATION POINT 1: the batch was cancelled before this job was dispatched
        if self.cancel_requested() {
            tracing::info!("Replay {} cancelled before starting: {}", id, name);
            self.guard.finish(JobState::Cancelled);
            return;
        }

        if self.guard.registry.transition(id, JobState::Running).is_none() {
            return;
        }
        tracing::info!("Processing replay {}: {}", id, name);

        let plan = self.processor.plan(&self.file, &self.session);

        // CANCELLATION POINT 2: last chance before ffmpeg or the copy starts
        if self.cancel_requested() {
            tracing::info!("Replay {} cancelled before processing: {}", id, name);
            self.guard.finish(JobState::Cancelled);
            return;
        }

        let start = Instant::now();
        let result = self.processor.execute(&plan).await;
        self.guard.metrics.record_processing_time(start.elapsed());

        match result {
            Ok(outcome) => {
                tracing::info!("Replay {} completed ({:?}): {}", id, outcome, name);
                self.guard.metrics.record_outcome(outcome);
                self.guard.finish(JobState::Succeeded);
            }
            Err(e) => {
                tracing::error!("Replay {} failed: {} - {}", id, name, e);
                self.guard.metrics.record_failed();
                self.guard.finish(JobState::Failed);
            }
        }
    }
}

/// Waits for every job to reach a terminal state, then reports the batch result.
struct CompletionWatcher {
    session: Arc<ProcessingSession>,
    registry: JobRegistry,
    metrics: Arc<BatchMetrics>,
    listener: Arc<dyn StatusListener>,
    cancel_rx: watch::Receiver<bool>,
    force_rx: watch::Receiver<bool>,
    cancel_grace: Duration,
    completion_hook: Option<Arc<dyn CompletionHook>>,
}

impl CompletionWatcher {
    async fn run(mut self, mut jobs: JoinSet<()>) -> BatchSummary {
        let finished_naturally = tokio::select! {
            _ = drain(&mut jobs) => true,
            _ = flag_raised(&mut self.cancel_rx) => false,
        };

        if !finished_naturally {
            let grace = tokio::time::timeout(self.cancel_grace, drain(&mut jobs));
            let drained = tokio::select! {
                result = grace => result.is_ok(),
                _ = flag_raised(&mut self.force_rx) => false,
            };

            if !drained {
                tracing::warn!(
                    "{} job(s) still running after cancellation, aborting",
                    jobs.len()
                );
                jobs.abort_all();
                drain(&mut jobs).await;
            }
        }

        let summary = self.summarize();
        tracing::info!("{}", summary);
        self.metrics.log_summary();
        self.listener.on_finished(&summary);

        if !summary.cancelled && self.session.options.open_output_afterwards {
            if let Some(hook) = &self.completion_hook {
                hook.on_completed(&self.session.output_folder);
            }
        }

        summary
    }

    fn summarize(&self) -> BatchSummary {
        use std::sync::atomic::Ordering;

        let counts = self.registry.counts();
        BatchSummary {
            total: counts.total(),
            succeeded: counts.succeeded,
            failed: counts.failed,
            cancelled_jobs: counts.cancelled,
            merged: self.metrics.replays_merged.load(Ordering::Relaxed),
            copied: self.metrics.replays_copied.load(Ordering::Relaxed),
            untouched: self.metrics.replays_untouched.load(Ordering::Relaxed),
            elapsed: self.metrics.elapsed(),
            cancelled: self.registry.is_cancelled(),
        }
    }
}

async fn drain(jobs: &mut JoinSet<()>) {
    while let Some(result) = jobs.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!("Job task panicked: {}", e);
            }
        }
    }
}

/// Resolves once the flag is set; never resolves if the handle was dropped.
async fn flag_raised(flag_rx: &mut watch::Receiver<bool>) {
    if flag_rx.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}
