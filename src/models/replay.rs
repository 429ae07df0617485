use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// File extension of replay videos and of every container we write.
pub const CONTAINER_EXTENSION: &str = "mp4";

/// File extension of the separately recorded microphone track.
pub const AUDIO_EXTENSION: &str = "m4a";

/// Marker every replay file name carries.
pub const REPLAY_MARKER: &str = "_replay_";

/// Marker appended to replays that have already been merged.
pub const MERGED_MARKER: &str = "_merged";

/// Suffix of the staging file written next to the source in replace mode.
pub const STAGING_SUFFIX: &str = "_temp";

/// Stable identifier assigned to a replay at discovery time.
///
/// The id is the replay's index in the sorted discovery result, so it is unique
/// within one session even when two replays share a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplayId(pub usize);

impl fmt::Display for ReplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable reference to a replay video on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayFile {
    pub id: ReplayId,
    pub path: Utf8PathBuf,
    /// File name without its extension
    pub base_name: String,
    pub parent_dir: Utf8PathBuf,
}

impl ReplayFile {
    /// Build a replay reference from a path.
    ///
    /// Returns `None` for paths without a file name or parent directory.
    pub fn new(id: ReplayId, path: Utf8PathBuf) -> Option<Self> {
        let base_name = path.file_stem()?.to_string();
        let parent_dir = path.parent()?.to_path_buf();

        Some(Self {
            id,
            path,
            base_name,
            parent_dir,
        })
    }

    /// File name including extension, used for display and sorting.
    pub fn file_name(&self) -> &str {
        self.path.file_name().unwrap_or(self.base_name.as_str())
    }

    /// Name of the directory directly containing the replay.
    pub fn parent_name(&self) -> Option<&str> {
        self.parent_dir.file_name()
    }

    /// Path of the microphone track that belongs to this replay.
    pub fn companion_audio_path(&self) -> Utf8PathBuf {
        self.parent_dir.join(format!("{}.{}", self.base_name, AUDIO_EXTENSION))
    }

    /// Staging path used while muxing in replace mode.
    pub fn staging_path(&self) -> Utf8PathBuf {
        self.parent_dir.join(format!(
            "{}{}.{}",
            self.base_name, STAGING_SUFFIX, CONTAINER_EXTENSION
        ))
    }

    /// File name of the merged copy written to the output folder.
    pub fn merged_file_name(&self) -> String {
        format!("{}{}.{}", self.base_name, MERGED_MARKER, CONTAINER_EXTENSION)
    }

    /// Whether the replay lives in a subfolder of `input_root` rather than in it directly.
    ///
    /// Only directory names are compared, matching how the output layout mirrors
    /// a single level of folder structure.
    pub fn is_in_subfolder_of(&self, input_root: &Utf8Path) -> bool {
        self.parent_name() != input_root.file_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(path: &str) -> ReplayFile {
        ReplayFile::new(ReplayId(0), Utf8PathBuf::from(path)).unwrap()
    }

    #[test]
    fn test_derived_names() {
        let file = replay("/videos/Apex/game_replay_2024.mp4");

        assert_eq!(file.base_name, "game_replay_2024");
        assert_eq!(file.file_name(), "game_replay_2024.mp4");
        assert_eq!(file.parent_name(), Some("Apex"));
        assert_eq!(
            file.companion_audio_path(),
            Utf8PathBuf::from("/videos/Apex/game_replay_2024.m4a")
        );
        assert_eq!(
            file.staging_path(),
            Utf8PathBuf::from("/videos/Apex/game_replay_2024_temp.mp4")
        );
        assert_eq!(file.merged_file_name(), "game_replay_2024_merged.mp4");
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        let file = replay("/videos/clip.v2_replay_1.mp4");
        assert_eq!(file.base_name, "clip.v2_replay_1");
    }

    #[test]
    fn test_subfolder_detection_compares_names() {
        let root = Utf8Path::new("/videos");

        assert!(!replay("/videos/a_replay_1.mp4").is_in_subfolder_of(root));
        assert!(replay("/videos/Apex/a_replay_1.mp4").is_in_subfolder_of(root));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ReplayId(7).to_string(), "#7");
    }
}
