// State management module
//
// This module provides the JobRegistry which tracks the state of every job in a batch
// behind Arc<RwLock<T>> so that jobs, the cancellation path and the completion watcher
// can all read and update it concurrently.

use crate::models::{JobState, JobStatus, ReplayFile, ReplayId};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// State of one job in the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRecord {
    pub file_name: String,
    pub state: JobState,
}

/// Number of jobs in each state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.queued + self.running + self.terminal()
    }

    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Snapshot of a batch: every registered job plus the cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct BatchState {
    pub jobs: BTreeMap<ReplayId, JobRecord>,
    pub cancelled: bool,
}

impl BatchState {
    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for record in self.jobs.values() {
            match record.state {
                JobState::Queued => counts.queued += 1,
                JobState::Running => counts.running += 1,
                JobState::Succeeded => counts.succeeded += 1,
                JobState::Failed => counts.failed += 1,
                JobState::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }

    /// True once every registered job has reached a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.jobs.values().all(|record| record.state.is_terminal())
    }
}

/// Thread-safe job table for one batch
///
/// This is the single place job states change. It:
/// - Provides thread-safe access to [`BatchState`] via `Arc<RwLock<T>>`
/// - Rejects illegal transitions, so a terminal job never changes again
/// - Returns a [`JobStatus`] for every accepted transition, ready to hand to a listener
///
/// Cloning is cheap and every clone sees the same table.
///
/// # Related Types
///
/// - [`crate::models::JobState`]: The per-job state machine
/// - [`crate::orchestrator::ProcessingOrchestrator`]: Drives transitions from job tasks
#[derive(Clone, Debug, Default)]
pub struct JobRegistry {
    state: Arc<RwLock<BatchState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking job must not take the registry down with it, so poisoned locks are recovered.
    fn read_lock(&self) -> RwLockReadGuard<'_, BatchState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, BatchState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the current batch state
    pub fn snapshot(&self) -> BatchState {
        self.read_lock().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let done = registry.read(|state| state.all_terminal());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BatchState) -> R,
    {
        let state = self.read_lock();
        f(&state)
    }

    /// Add a job in the `Queued` state and return its queued status event.
    pub fn register(&self, file: &ReplayFile) -> JobStatus {
        let record = JobRecord {
            file_name: file.file_name().to_string(),
            state: JobState::Queued,
        };
        let status = JobStatus {
            id: file.id,
            file_name: record.file_name.clone(),
            state: JobState::Queued,
        };

        let mut state = self.write_lock();
        if state.jobs.insert(file.id, record).is_some() {
            tracing::warn!("Job {} registered twice, state reset to queued", file.id);
        }
        status
    }

    /// Move a job to `next`.
    ///
    /// Returns the resulting status event, or `None` when the job is unknown or
    /// the transition is not allowed from its current state.
    pub fn transition(&self, id: ReplayId, next: JobState) -> Option<JobStatus> {
        let mut state = self.write_lock();
        let Some(record) = state.jobs.get_mut(&id) else {
            tracing::warn!("Transition to {} for unknown job {}", next, id);
            return None;
        };

        if !record.state.can_transition_to(next) {
            tracing::debug!(
                "Ignoring transition {} -> {} for job {} ({})",
                record.state,
                next,
                id,
                record.file_name
            );
            return None;
        }

        record.state = next;
        Some(JobStatus {
            id,
            file_name: record.file_name.clone(),
            state: next,
        })
    }

    pub fn state_of(&self, id: ReplayId) -> Option<JobState> {
        self.read(|state| state.jobs.get(&id).map(|record| record.state))
    }

    pub fn counts(&self) -> JobCounts {
        self.read(BatchState::counts)
    }

    /// Flag the batch as cancelled. Returns `true` only for the first call.
    pub fn mark_cancelled(&self) -> bool {
        let mut state = self.write_lock();
        let first = !state.cancelled;
        state.cancelled = true;
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.read(|state| state.cancelled)
    }
}
