use super::ffmpeg::Muxer;
use crate::models::{ProcessingSession, ReplayFile};
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use thiserror::Error;
use tokio::fs;

/// Errors that can occur while processing a single replay
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to launch {tool}: {source}")]
    ToolUnavailable {
        tool: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mux tool exited with code {}: {stderr}", exit_code(*code))]
    MuxFailed { code: Option<i32>, stderr: String },

    #[error("Mux tool reported success but {0} was not written")]
    MissingOutput(Utf8PathBuf),

    #[error("Failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

fn exit_code(code: Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl ProcessingError {
    fn io(operation: &'static str, path: &Utf8Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }
}

/// What will happen to a replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayAction {
    /// Mux the replay with this microphone track
    Merge { audio: Utf8PathBuf },
    /// No microphone track; copy the replay verbatim
    Copy,
    /// No microphone track and the source is replaced in place: nothing to do
    Untouched,
}

/// Result of a successfully processed replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Merged,
    Copied,
    Untouched,
}

/// Decisions for one replay, computed before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPlan {
    pub source: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub action: ReplayAction,
    pub replace_source: bool,
    pub delete_microphone_track: bool,
}

/// Compute where the processed replay goes.
///
/// In replace mode this is a staging file next to the source, because the mux
/// tool cannot rewrite the file it is reading. Otherwise the merged copy goes
/// to the output folder, inside a folder named after the replay's parent when
/// the replay was found in a subfolder of the input root.
pub fn output_path(file: &ReplayFile, session: &ProcessingSession) -> Utf8PathBuf {
    if session.options.replace_source {
        return file.staging_path();
    }

    let mut output = session.output_folder.clone();
    if file.is_in_subfolder_of(&session.input_root) {
        if let Some(parent) = file.parent_name() {
            output.push(parent);
        }
    }
    output.push(file.merged_file_name());
    output
}

/// Per-replay transform: merge, copy or leave alone.
///
/// Holds no mutable state and only touches paths derived from its input replay,
/// so one processor can serve many concurrent jobs.
pub struct ReplayProcessor<M> {
    muxer: M,
}

impl<M: Muxer> ReplayProcessor<M> {
    pub fn new(muxer: M) -> Self {
        Self { muxer }
    }

    pub fn muxer(&self) -> &M {
        &self.muxer
    }

    /// Decide the output path and action for `file`.
    pub fn plan(&self, file: &ReplayFile, session: &ProcessingSession) -> ReplayPlan {
        let options = session.options;
        let audio = file.companion_audio_path();

        let action = if audio.is_file() {
            ReplayAction::Merge { audio }
        } else if options.replace_source {
            ReplayAction::Untouched
        } else {
            ReplayAction::Copy
        };

        ReplayPlan {
            source: file.path.clone(),
            output: output_path(file, session),
            action,
            replace_source: options.replace_source,
            delete_microphone_track: options.delete_microphone_track_after_merge,
        }
    }

    /// Carry out a plan produced by [`plan`](Self::plan).
    pub async fn execute(&self, plan: &ReplayPlan) -> Result<ProcessOutcome, ProcessingError> {
        match &plan.action {
            ReplayAction::Merge { audio } => {
                self.merge(plan, audio).await?;
                Ok(ProcessOutcome::Merged)
            }
            ReplayAction::Copy => {
                tracing::info!(
                    "Replay has no microphone track, copying to output folder - {}",
                    plan.source
                );
                create_parent_dir(&plan.output).await?;
                fs::copy(&plan.source, &plan.output)
                    .await
                    .map_err(ProcessingError::io("copy", &plan.source))?;
                Ok(ProcessOutcome::Copied)
            }
            ReplayAction::Untouched => {
                tracing::info!(
                    "Replay has no microphone track, nothing to do - {}",
                    plan.source
                );
                Ok(ProcessOutcome::Untouched)
            }
        }
    }

    /// Plan and execute in one step.
    pub async fn process(
        &self,
        file: &ReplayFile,
        session: &ProcessingSession,
    ) -> Result<ProcessOutcome, ProcessingError> {
        let plan = self.plan(file, session);
        self.execute(&plan).await
    }

    async fn merge(&self, plan: &ReplayPlan, audio: &Utf8Path) -> Result<(), ProcessingError> {
        tracing::info!("Merging microphone track into {}", plan.source);
        create_parent_dir(&plan.output).await?;

        // Removes a partial output on error, or when this future is dropped mid-mux
        let mut partial = PartialOutput::new(&plan.output);

        self.muxer.mux(&plan.source, audio, &plan.output).await?;

        let written = fs::try_exists(&plan.output)
            .await
            .map_err(ProcessingError::io("inspect", &plan.output))?;
        if !written {
            return Err(ProcessingError::MissingOutput(plan.output.clone()));
        }

        if plan.replace_source {
            // rename replaces the destination atomically; the source path always holds a full file
            fs::rename(&plan.output, &plan.source)
                .await
                .map_err(ProcessingError::io("replace", &plan.source))?;
            partial.keep();

            if plan.delete_microphone_track {
                fs::remove_file(audio)
                    .await
                    .map_err(ProcessingError::io("delete", audio))?;
                tracing::debug!("Deleted microphone track {}", audio);
            }
        } else {
            partial.keep();
        }

        tracing::info!("Replay processed: {}", plan.source);
        Ok(())
    }
}

async fn create_parent_dir(path: &Utf8Path) -> Result<(), ProcessingError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(ProcessingError::io("create", parent))?;
    }
    Ok(())
}

/// Deletes a mux output on drop unless [`keep`](Self::keep) was called.
///
/// A staging file left behind would be picked up as a new replay on the next run.
struct PartialOutput<'a> {
    path: &'a Utf8Path,
    keep: bool,
}

impl<'a> PartialOutput<'a> {
    fn new(path: &'a Utf8Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match std::fs::remove_file(self.path) {
            Ok(()) => tracing::debug!("Removed partial output {}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove partial output {}: {}", self.path, e),
        }
    }
}
