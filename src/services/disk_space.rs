use crate::models::ReplayFile;
use camino::{Utf8Path, Utf8PathBuf};
use humansize::{BINARY, format_size};
use std::path::PathBuf;
use sysinfo::Disks;

/// Outcome of the pre-flight disk space check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub approved: bool,
    pub required_bytes: u64,
    pub available_bytes: u64,
}

impl AdmissionDecision {
    /// Apply the admission rule: a batch only starts when it needs strictly less
    /// than what is free. An exact fit is rejected.
    pub fn evaluate(required_bytes: u64, available_bytes: u64) -> Self {
        Self {
            approved: required_bytes < available_bytes,
            required_bytes,
            available_bytes,
        }
    }

    /// Human readable description, e.g. "1.50 GiB required, 20 GiB available".
    pub fn describe(&self) -> String {
        format!(
            "{} required, {} available",
            format_size(self.required_bytes, BINARY),
            format_size(self.available_bytes, BINARY)
        )
    }
}

/// Where the free space figure comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpaceSource {
    /// Query the disk hosting the output folder
    System,
    /// Fixed figure, for tests and dry runs
    Fixed(u64),
}

/// Gate that decides whether a batch fits on the output volume.
///
/// The required size is the on-disk size of the source replays, which is an
/// approximation of the merged output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpaceGuard {
    source: SpaceSource,
}

impl DiskSpaceGuard {
    pub fn system() -> Self {
        Self {
            source: SpaceSource::System,
        }
    }

    pub fn with_available_bytes(bytes: u64) -> Self {
        Self {
            source: SpaceSource::Fixed(bytes),
        }
    }

    /// Compare the total size of `files` with the free space at `output_volume`.
    pub fn check_admission(
        &self,
        files: &[ReplayFile],
        output_volume: &Utf8Path,
    ) -> AdmissionDecision {
        let required = total_size(files);
        let available = match self.source {
            SpaceSource::Fixed(bytes) => bytes,
            SpaceSource::System => available_space(output_volume).unwrap_or_else(|| {
                tracing::warn!("Could not determine free space for {}", output_volume);
                0
            }),
        };

        let decision = AdmissionDecision::evaluate(required, available);
        if decision.approved {
            tracing::info!("Disk space check passed: {}", decision.describe());
        } else {
            tracing::warn!("Disk space check failed: {}", decision.describe());
        }
        decision
    }
}

impl Default for DiskSpaceGuard {
    fn default() -> Self {
        Self::system()
    }
}

/// Sum of the on-disk lengths of `files`. Files that vanished count as empty.
pub fn total_size(files: &[ReplayFile]) -> u64 {
    files
        .iter()
        .map(|file| match std::fs::metadata(&file.path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::debug!("Failed to stat {}: {}", file.path, e);
                0
            }
        })
        .sum()
}

/// Free bytes on the filesystem that hosts `path`.
///
/// `path` does not have to exist yet; its nearest existing ancestor decides the volume.
pub fn available_space(path: &Utf8Path) -> Option<u64> {
    let existing = nearest_existing_ancestor(path)?;
    let resolved = std::fs::canonicalize(&existing).unwrap_or_else(|_| PathBuf::from(existing));

    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| resolved.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}

fn nearest_existing_ancestor(path: &Utf8Path) -> Option<Utf8PathBuf> {
    path.ancestors()
        .find(|candidate| !candidate.as_str().is_empty() && candidate.exists())
        .map(Utf8Path::to_path_buf)
}
