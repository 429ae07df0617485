use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Choices the user makes for one batch run.
///
/// Supplied once when a run starts and never changed while it is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Overwrite the source replay with the merged result instead of writing a copy
    #[serde(default)]
    pub replace_source: bool,

    /// Remove the microphone track once it has been merged into a replaced source
    #[serde(default)]
    pub delete_microphone_track_after_merge: bool,

    /// Remove an existing output folder before processing
    #[serde(default)]
    pub clean_output_folder_first: bool,

    /// Open the output folder in the file manager when the batch finishes
    #[serde(default)]
    pub open_output_afterwards: bool,
}

/// Engine configuration from ReplayMerger.yaml
///
/// Every key is optional; missing keys take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "FFmpeg Path", default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(rename = "Output Folder Name", default = "default_output_folder_name")]
    pub output_folder_name: String,

    #[serde(rename = "Cancel Grace Seconds", default = "default_cancel_grace_secs")]
    pub cancel_grace_secs: u64,

    #[serde(rename = "Log Directory", default = "default_log_dir")]
    pub log_dir: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            output_folder_name: default_output_folder_name(),
            cancel_grace_secs: default_cancel_grace_secs(),
            log_dir: default_log_dir(),
            debug_mode: false,
        }
    }
}

impl EngineConfig {
    pub fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_output_folder_name() -> String {
    "replays_merged".to_string()
}

fn default_cancel_grace_secs() -> u64 {
    5
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.output_folder_name, "replays_merged");
        assert_eq!(config.cancel_grace(), Duration::from_secs(5));
        assert!(!config.debug_mode);
    }

    #[test]
    fn test_processing_options_default_to_off() {
        let options = ProcessingOptions::default();
        assert!(!options.replace_source);
        assert!(!options.delete_microphone_track_after_merge);
        assert!(!options.clean_output_folder_first);
        assert!(!options.open_output_afterwards);
    }
}
