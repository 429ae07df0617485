use crate::models::{
    CONTAINER_EXTENSION, EngineConfig, MERGED_MARKER, ProcessingOptions, ProcessingSession,
};
use crate::services::{AdmissionDecision, DiskSpaceGuard, discover};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that stop a batch before any job starts
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Input folder {0} does not exist or is not a directory")]
    InputNotFound(Utf8PathBuf),

    #[error("No replays found in {0} or any of its subdirectories")]
    NoReplaysFound(Utf8PathBuf),

    #[error("Not enough disk space at {folder}: {}", decision.describe())]
    InsufficientSpace {
        folder: Utf8PathBuf,
        decision: AdmissionDecision,
    },

    #[error("Failed to prepare output folder {path}: {source}")]
    OutputFolder {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Work out the folder merged replays are written to.
///
/// Replace mode writes next to the sources, so the input root is returned.
/// Otherwise the folder is `<output root>/<folder name>`, where the output root
/// defaults to the input root and the name is not appended twice.
pub fn resolve_output_folder(
    input_root: &Utf8Path,
    output_root: Option<&Utf8Path>,
    options: &ProcessingOptions,
    folder_name: &str,
) -> Utf8PathBuf {
    if options.replace_source {
        return input_root.to_path_buf();
    }

    let root = output_root.unwrap_or(input_root);
    if root.file_name() == Some(folder_name) {
        root.to_path_buf()
    } else {
        root.join(folder_name)
    }
}

/// Build a session for one batch run.
///
/// Discovers replays below `input_root`, checks that they fit on the output
/// volume and prepares the output folder (removing earlier merged replays
/// from it first when requested).
/// Nothing is created or deleted unless the admission check passes.
pub fn prepare_session(
    input_root: &Utf8Path,
    output_root: Option<&Utf8Path>,
    options: ProcessingOptions,
    config: &EngineConfig,
    guard: &DiskSpaceGuard,
) -> Result<ProcessingSession, SessionError> {
    if !input_root.is_dir() {
        return Err(SessionError::InputNotFound(input_root.to_path_buf()));
    }

    let files = discover(input_root);
    if files.is_empty() {
        return Err(SessionError::NoReplaysFound(input_root.to_path_buf()));
    }

    let output_folder =
        resolve_output_folder(input_root, output_root, &options, &config.output_folder_name);

    let decision = guard.check_admission(&files, &output_folder);
    if !decision.approved {
        return Err(SessionError::InsufficientSpace {
            folder: output_folder,
            decision,
        });
    }

    if !options.replace_source {
        if options.clean_output_folder_first && output_folder.exists() {
            let removed = remove_merged_replays(&output_folder).map_err(|source| {
                SessionError::OutputFolder {
                    path: output_folder.clone(),
                    source,
                }
            })?;
            tracing::info!(
                "Cleaned output folder {}: {} merged replay(s) removed",
                output_folder,
                removed
            );
        }

        fs::create_dir_all(&output_folder).map_err(|source| SessionError::OutputFolder {
            path: output_folder.clone(),
            source,
        })?;
    }

    Ok(ProcessingSession {
        input_root: input_root.to_path_buf(),
        output_root: output_root.unwrap_or(input_root).to_path_buf(),
        output_folder,
        files,
        options,
    })
}

/// Delete every previously merged replay (`*_merged.mp4`) below `folder`.
///
/// Only merged outputs are removed. The folder may be, or contain, the input
/// root, so sources and microphone tracks must survive a clean.
pub fn remove_merged_replays(folder: &Utf8Path) -> io::Result<usize> {
    let suffix = format!("{}.{}", MERGED_MARKER, CONTAINER_EXTENSION);
    let mut removed = 0;

    for entry in WalkDir::new(folder).min_depth(1) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry while cleaning: {}", e);
                continue;
            }
        };

        let is_merged = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(&suffix));
        if entry.file_type().is_file() && is_merged {
            fs::remove_file(entry.path())?;
            tracing::debug!("Removed {}", entry.path().display());
            removed += 1;
        }
    }

    Ok(removed)
}
