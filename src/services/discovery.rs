use crate::models::{CONTAINER_EXTENSION, MERGED_MARKER, REPLAY_MARKER, ReplayFile, ReplayId};
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

/// Check whether a file name denotes a replay that still needs processing.
///
/// Matching is case-sensitive: the name must end with `.mp4`, contain
/// `_replay_`, and must not contain `_merged`.
pub fn is_unprocessed_replay(file_name: &str) -> bool {
    file_name.ends_with(&format!(".{}", CONTAINER_EXTENSION))
        && file_name.contains(REPLAY_MARKER)
        && !file_name.contains(MERGED_MARKER)
}

/// Recursively collect unprocessed replays below `root`.
///
/// Unreadable directories are treated as empty. The result is sorted by file
/// name only; replays sharing a name keep their (deterministic) traversal order.
/// Ids are assigned from the sorted position.
///
/// Nothing is cached, so calling this again re-scans the filesystem.
pub fn discover(root: &Utf8Path) -> Vec<ReplayFile> {
    let mut paths: Vec<Utf8PathBuf> = Vec::new();
    let mut unreadable = 0usize;

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                unreadable += 1;
                tracing::debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_unprocessed_replay(name) {
            continue;
        }

        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => paths.push(path),
            Err(path) => {
                tracing::warn!("Skipping replay with non UTF-8 path: {}", path.display());
            }
        }
    }

    // Stable sort keeps traversal order for equal names
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let replays: Vec<ReplayFile> = paths
        .into_iter()
        .enumerate()
        .filter_map(|(index, path)| ReplayFile::new(ReplayId(index), path))
        .collect();

    tracing::info!(
        "Discovered {} unprocessed replay(s) under {} ({} unreadable entries skipped)",
        replays.len(),
        root,
        unreadable
    );

    replays
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_predicate() {
        assert!(is_unprocessed_replay("race_replay_1.mp4"));
        assert!(is_unprocessed_replay("_replay_.mp4"));

        assert!(!is_unprocessed_replay("race_replay_1.m4a"));
        assert!(!is_unprocessed_replay("race_replay_1_merged.mp4"));
        assert!(!is_unprocessed_replay("race_1.mp4"));
        assert!(!is_unprocessed_replay("race_replay_1.MP4"));
        assert!(!is_unprocessed_replay("race_REPLAY_1.mp4"));
        assert!(!is_unprocessed_replay("race_replay_1.mp4.bak"));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let result = discover(Utf8Path::new("/definitely/not/a/real/replay/root"));
        assert!(result.is_empty());
    }
}
