//! Configuration management for the style grouper.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::walker::{WalkOptions, DEFAULT_YIELD_EVERY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Errors reading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub panel: PanelConfig,
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
pub struct ScanConfig {
    /// Node visits between yields to the host
    #[serde(default = "default_yield_every")]
    pub yield_every: usize,

    /// Skip hidden layers and everything below them
    #[serde(default = "default_true")]
    pub skip_invisible: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            yield_every: DEFAULT_YIELD_EVERY,
            skip_invisible: true,
        }
    }
}

impl ScanConfig {
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            yield_every: self.yield_every.max(1),
            skip_invisible: self.skip_invisible,
        }
    }
}

/// What a genuine selection change leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMode {
    /// Rescan and push the new groups
    #[default]
    Scan,
    /// Tell the panel, which asks for a scan itself
    Notify,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// How long our own reselection is kept from triggering a scan
    #[serde(default = "default_suppression_ms")]
    pub suppression_ms: u64,

    #[serde(default)]
    pub on_change: ChangeMode,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            suppression_ms: default_suppression_ms(),
            on_change: ChangeMode::default(),
        }
    }
}

impl SelectionConfig {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_panel_width")]
    pub width: u32,

    #[serde(default = "default_panel_height")]
    pub height: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: default_panel_width(),
            height: default_panel_height(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_yield_every() -> usize {
    DEFAULT_YIELD_EVERY
}

fn default_suppression_ms() -> u64 {
    500
}

fn default_panel_width() -> u32 {
    240
}

fn default_panel_height() -> u32 {
    400
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        let result = Self::read_from_path(&path);
        Self::or_default(&path, result)
    }

    /// Read and parse a configuration file without logging
    pub fn read_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Log the outcome of [`read_from_path`](Self::read_from_path) and fall
    /// back to defaults on failure
    pub fn or_default(path: &Path, result: Result<Self, ConfigError>) -> Self {
        match result {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(ConfigError::Io(_)) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                warn!("Failed to parse config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("style-grouper")
            .join("config.toml")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.scan.yield_every, 10);
        assert!(config.scan.skip_invisible);
        assert_eq!(config.selection.suppression_window(), Duration::from_millis(500));
        assert_eq!(config.selection.on_change, ChangeMode::Scan);
        assert_eq!((config.panel.width, config.panel.height), (240, 400));
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[scan]
yield_every = 25

[selection]
on_change = "notify"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.scan.yield_every, 25);
        assert!(config.scan.skip_invisible);
        assert_eq!(config.selection.on_change, ChangeMode::Notify);
        assert_eq!(config.selection.suppression_ms, 500);
    }

    #[test]
    fn test_zero_yield_clamped() {
        let config = ScanConfig {
            yield_every: 0,
            skip_invisible: false,
        };
        assert_eq!(config.walk_options().yield_every, 1);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.selection.suppression_ms = 750;
        config.save_to_path(path.clone()).unwrap();

        let loaded = Config::load_from_path(path);
        assert_eq!(loaded.selection.suppression_ms, 750);
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scan\nyield_every = ").unwrap();

        let loaded = Config::load_from_path(path);
        assert_eq!(loaded.scan.yield_every, 10);
    }

    #[test]
    fn test_read_distinguishes_missing_from_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::read_from_path(&missing),
            Err(ConfigError::Io(_))
        ));

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[scan\nyield_every = ").unwrap();
        assert!(matches!(
            Config::read_from_path(&invalid),
            Err(ConfigError::Parse(_))
        ));
    }
}
