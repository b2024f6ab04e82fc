//! Configuration management for the sideline agent

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Segment recording configuration
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Connectivity probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Sync status persistence
    #[serde(default)]
    pub sync: SyncConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Managed directory finished segments are copied into
    #[serde(default = "default_segments_directory_option")]
    pub segments_directory: Option<PathBuf>,

    /// How long stop waits for the active segment to finish (ms)
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_ms: u64,

    /// Poll interval while waiting for the active segment to finish (ms)
    #[serde(default = "default_stop_poll_interval")]
    pub stop_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Object store upload endpoint, e.g. `https://host/v0/b/<bucket>/o`
    pub endpoint: Option<String>,

    /// Bearer token sent with every upload
    pub auth_token: Option<String>,

    /// Object name prefix for video files
    #[serde(default = "default_video_prefix")]
    pub video_prefix: String,

    /// Object name prefix for JSON sidecars
    #[serde(default = "default_manifest_prefix")]
    pub manifest_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Low-overhead endpoint answering 200 or 204
    #[serde(default = "default_probe_url")]
    pub url: String,

    /// Probe timeout (ms)
    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// File backing the key-value store
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Key the whole sync map is stored under
    #[serde(default = "default_map_key")]
    pub map_key: String,
}

fn default_segments_directory() -> PathBuf {
    std::env::temp_dir().join("sideline").join("segments")
}

fn default_segments_directory_option() -> Option<PathBuf> {
    Some(default_segments_directory())
}

fn default_stop_timeout() -> u64 {
    2500
}

fn default_stop_poll_interval() -> u64 {
    40
}

fn default_video_prefix() -> String {
    "videos".to_string()
}

fn default_manifest_prefix() -> String {
    "manifests".to_string()
}

fn default_probe_url() -> String {
    "https://clients3.google.com/generate_204".to_string()
}

fn default_probe_timeout() -> u64 {
    2500
}

fn default_map_key() -> String {
    "sync:map:v1".to_string()
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            segments_directory: default_segments_directory_option(),
            stop_timeout_ms: default_stop_timeout(),
            stop_poll_interval_ms: default_stop_poll_interval(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            video_prefix: default_video_prefix(),
            manifest_prefix: default_manifest_prefix(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
            timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            map_key: default_map_key(),
        }
    }
}

impl RecordingConfig {
    pub fn segments_dir(&self) -> PathBuf {
        self.segments_directory
            .clone()
            .unwrap_or_else(default_segments_directory)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms.max(1))
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = Config::default();
            config.config_path = Some(config_path);
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// File backing the sync map; defaults to the project data directory
    pub fn sync_store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.sync.store_path {
            return Ok(path.clone());
        }
        let proj_dirs = directories::ProjectDirs::from("dev", "sideline", "agent")
            .context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().join("store.json"))
    }

    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "sideline", "agent")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
