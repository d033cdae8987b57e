//! Configuration management for content capture.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::types::CaptureError;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Quiet period before a selection change is captured
    #[serde(default = "default_selection_debounce")]
    pub selection_debounce_ms: u64,

    /// Quiet period before a mouse move is captured
    #[serde(default = "default_hover_debounce")]
    pub hover_debounce_ms: u64,
}

impl TimingConfig {
    pub fn selection_debounce(&self) -> Duration {
        Duration::from_millis(self.selection_debounce_ms)
    }

    pub fn hover_debounce(&self) -> Duration {
        Duration::from_millis(self.hover_debounce_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            selection_debounce_ms: default_selection_debounce(),
            hover_debounce_ms: default_hover_debounce(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Key that arms capture mode while held
    #[serde(default = "default_modifier_key")]
    pub modifier_key: String,

    /// Tags treated as block containers for hover capture
    #[serde(default = "default_block_tags")]
    pub block_tags: Vec<String>,

    /// Base URL for resolving relative anchor hrefs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl CaptureConfig {
    /// Parse the configured base URL, if any
    pub fn base_url(&self) -> Result<Option<Url>, CaptureError> {
        self.base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(CaptureError::from)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            modifier_key: default_modifier_key(),
            block_tags: default_block_tags(),
            base_url: None,
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_selection_debounce() -> u64 {
    100
}

fn default_hover_debounce() -> u64 {
    200
}

fn default_modifier_key() -> String {
    "Alt".to_string()
}

fn default_block_tags() -> Vec<String> {
    ["p", "div", "li", "article", "section"]
        .iter()
        .map(|tag| tag.to_string())
        .collect()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("content-capture")
            .join("config.toml")
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
