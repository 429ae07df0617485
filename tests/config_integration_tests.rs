//! Integration tests for ConfigManager and ReplayMerger.yaml handling
//!
//! These tests verify:
//! - Default configuration when no file exists
//! - Loading a complete configuration file
//! - Interaction of the configured folder name with session preparation
//! - Rejection of malformed files

mod common;

use camino::Utf8PathBuf;
use common::{temp_root, write_file};
use replay_merger::config::ENGINE_CONFIG_FILE;
use replay_merger::services::DiskSpaceGuard;
use replay_merger::{ConfigManager, EngineConfig, ProcessingOptions, prepare_session};
use std::fs;
use std::time::Duration;

fn create_test_config_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    temp_root()
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(
        manager.engine_config_path(),
        config_path.join(ENGINE_CONFIG_FILE)
    );
}

#[test]
fn test_load_default_engine_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let config = manager.load_engine_config().unwrap();

    assert_eq!(config.ffmpeg_path, "ffmpeg");
    assert_eq!(config.output_folder_name, "replays_merged");
    assert_eq!(config.cancel_grace(), Duration::from_secs(5));
    assert_eq!(config.log_dir, "logs");
    assert!(!config.debug_mode);
}

#[test]
fn test_load_full_engine_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let yaml = r#"
FFmpeg Path: "C:\\Tools\\ffmpeg\\bin\\ffmpeg.exe"
Output Folder Name: with_mic
Cancel Grace Seconds: 10
Log Directory: "ReplayMerger Data/logs"
Debug Mode: true
"#;
    fs::write(manager.engine_config_path(), yaml).unwrap();

    let config = manager.load_engine_config().unwrap();

    assert_eq!(config.ffmpeg_path, "C:\\Tools\\ffmpeg\\bin\\ffmpeg.exe");
    assert_eq!(config.output_folder_name, "with_mic");
    assert_eq!(config.cancel_grace(), Duration::from_secs(10));
    assert_eq!(config.log_dir, "ReplayMerger Data/logs");
    assert!(config.debug_mode);
}

#[test]
fn test_configured_folder_name_is_used_for_output() {
    let (_temp_dir, root) = create_test_config_dir();
    let manager = ConfigManager::new(root.join("config")).unwrap();
    fs::write(manager.engine_config_path(), "Output Folder Name: with_mic\n").unwrap();
    let config = manager.load_engine_config().unwrap();

    write_file(&root.join("videos/a_replay_1.mp4"), b"V");
    let session = prepare_session(
        &root.join("videos"),
        None,
        ProcessingOptions::default(),
        &config,
        &DiskSpaceGuard::with_available_bytes(u64::MAX),
    )
    .unwrap();

    assert_eq!(session.output_folder, root.join("videos/with_mic"));
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.engine_config_path(), "Cancel Grace Seconds: soon\n").unwrap();

    let err = manager.load_engine_config().unwrap_err();
    assert!(err.to_string().contains("Failed to parse engine config"));
}

#[test]
fn test_engine_config_roundtrip_keeps_key_names() {
    let yaml = serde_yaml_ng::to_string(&EngineConfig::default()).unwrap();

    assert!(yaml.contains("FFmpeg Path"));
    assert!(yaml.contains("Output Folder Name"));
    assert!(yaml.contains("Cancel Grace Seconds"));
}
