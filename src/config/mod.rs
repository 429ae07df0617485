use crate::models::EngineConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the engine configuration inside the config directory.
pub const ENGINE_CONFIG_FILE: &str = "ReplayMerger.yaml";

/// Configuration manager for loading the YAML engine configuration.
///
/// Only reads: the engine settings (`ReplayMerger.yaml`) are edited by hand,
/// and per-run choices come from the command line.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    engine_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing configuration files (e.g., "ReplayMerger Data")
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            engine_config_path: config_dir.join(ENGINE_CONFIG_FILE),
            config_dir,
        })
    }

    /// Load the engine configuration file.
    ///
    /// # Returns
    /// The loaded EngineConfig, or defaults if the file doesn't exist
    pub fn load_engine_config(&self) -> Result<EngineConfig> {
        if !self.engine_config_path.exists() {
            tracing::warn!(
                "Engine config file not found at {}, using defaults",
                self.engine_config_path
            );
            return Ok(EngineConfig::default());
        }

        let file_contents = fs::read_to_string(&self.engine_config_path).with_context(|| {
            format!("Failed to read engine config: {}", self.engine_config_path)
        })?;

        // An empty file means "all defaults"
        if file_contents.trim().is_empty() {
            return Ok(EngineConfig::default());
        }

        let config: EngineConfig = serde_yaml_ng::from_str(&file_contents).with_context(|| {
            format!("Failed to parse engine config: {}", self.engine_config_path)
        })?;

        if config.output_folder_name.trim().is_empty() {
            anyhow::bail!(
                "Output Folder Name in {} must not be empty",
                self.engine_config_path
            );
        }

        tracing::info!("Loaded engine config from {}", self.engine_config_path);
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn engine_config_path(&self) -> &Utf8Path {
        &self.engine_config_path
    }
}
