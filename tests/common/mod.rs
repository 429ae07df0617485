//! Shared helpers for the integration tests: temp trees, an in-process muxer,
//! and recording listeners.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use replay_merger::services::{Muxer, ProcessingError};
use replay_merger::{BatchSummary, CompletionHook, JobState, JobStatus, StatusListener};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Create a temp directory and return it with its UTF-8 path.
pub fn temp_root() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, root)
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Utf8Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Muxer that concatenates the video and audio bytes into the output.
///
/// Can fail for videos whose path contains a marker, and can be gated on a
/// semaphore so tests control when each mux finishes.
#[derive(Clone, Default)]
pub struct FakeMuxer {
    calls: Arc<Mutex<Vec<Utf8PathBuf>>>,
    started: Arc<AtomicUsize>,
    fail_marker: Option<String>,
    gate: Option<Arc<Semaphore>>,
    hang: bool,
}

impl FakeMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail (after writing a partial output) for videos whose path contains `marker`.
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    /// Every mux waits for one permit of `gate` before writing.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Write a partial output, then never finish.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Number of mux calls that have started
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Videos passed to `mux`, in call order
    pub fn calls(&self) -> Vec<Utf8PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Muxer for FakeMuxer {
    async fn mux(
        &self,
        video: &Utf8Path,
        audio: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<(), ProcessingError> {
        self.calls.lock().unwrap().push(video.to_path_buf());

        if self.hang {
            tokio::fs::write(output, b"partial").await.unwrap();
            self.started.fetch_add(1, Ordering::SeqCst);
            return std::future::pending().await;
        }
        self.started.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(marker) = &self.fail_marker {
            if video.as_str().contains(marker.as_str()) {
                tokio::fs::write(output, b"partial").await.unwrap();
                return Err(ProcessingError::MuxFailed {
                    code: Some(1),
                    stderr: "Invalid data found when processing input".to_string(),
                });
            }
        }

        let mut bytes = tokio::fs::read(video).await.unwrap();
        bytes.extend(tokio::fs::read(audio).await.unwrap());
        tokio::fs::write(output, bytes).await.unwrap();
        Ok(())
    }
}

/// Listener that records every event and summary it receives.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<JobStatus>>>,
    summaries: Arc<Mutex<Vec<BatchSummary>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobStatus> {
        self.events.lock().unwrap().clone()
    }

    /// States reported for one file, in order
    pub fn states_for(&self, file_name: &str) -> Vec<JobState> {
        self.events()
            .into_iter()
            .filter(|e| e.file_name == file_name)
            .map(|e| e.state)
            .collect()
    }

    pub fn count(&self, state: JobState) -> usize {
        self.events().iter().filter(|e| e.state == state).count()
    }

    pub fn summaries(&self) -> Vec<BatchSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

impl StatusListener for Recorder {
    fn on_status(&self, status: &JobStatus) {
        self.events.lock().unwrap().push(status.clone());
    }

    fn on_finished(&self, summary: &BatchSummary) {
        self.summaries.lock().unwrap().push(summary.clone());
    }
}

/// Completion hook that counts its invocations.
#[derive(Clone, Default)]
pub struct CountingHook {
    calls: Arc<Mutex<Vec<Utf8PathBuf>>>,
}

impl CountingHook {
    pub fn calls(&self) -> Vec<Utf8PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl CompletionHook for CountingHook {
    fn on_completed(&self, output_folder: &Utf8Path) {
        self.calls.lock().unwrap().push(output_folder.to_path_buf());
    }
}

/// Poll `condition` until it holds, failing the test after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
