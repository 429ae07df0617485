use super::{ProcessingOptions, ReplayFile};
use camino::{Utf8Path, Utf8PathBuf};

/// Working context for one batch run.
///
/// Built by [`crate::orchestrator::prepare_session`] (or directly in tests) and
/// handed to the orchestrator, which shares it read-only with every job.
#[derive(Debug, Clone)]
pub struct ProcessingSession {
    pub input_root: Utf8PathBuf,
    /// Root the user picked for output; defaults to the input root
    pub output_root: Utf8PathBuf,
    /// Folder merged replays are written to (input root in replace mode)
    pub output_folder: Utf8PathBuf,
    pub files: Vec<ReplayFile>,
    pub options: ProcessingOptions,
}

impl ProcessingSession {
    /// Create a session whose output folder is `output_folder` as given.
    pub fn new(
        input_root: impl Into<Utf8PathBuf>,
        output_folder: impl Into<Utf8PathBuf>,
        files: Vec<ReplayFile>,
        options: ProcessingOptions,
    ) -> Self {
        let output_folder = output_folder.into();
        Self {
            input_root: input_root.into(),
            output_root: output_folder.clone(),
            output_folder,
            files,
            options,
        }
    }

    pub fn output_folder(&self) -> &Utf8Path {
        &self.output_folder
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
