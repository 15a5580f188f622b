//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `enable_autoconnect`: Automatically connect to the first heart-rate device found
//! - `scan_duration_secs`: How long a discovery scan listens for advertisements
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/hrv-monitor/config.toml
//! - Linux: ~/.config/hrv-monitor/config.toml
//! - Windows: %APPDATA%\hrv-monitor\config.toml
//!
//! ## Why TOML
//! Human-readable format allows manual editing if needed. Serde provides
//! automatic serialization/deserialization.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub enable_autoconnect: bool,
    pub scan_duration_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_autoconnect: false,
            scan_duration_secs: 5,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hrv-monitor")
            .join("config.toml")
    }

    /// Load config from the default location, or create it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Load config from a specific path, creating a default file when missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents).map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.enable_autoconnect, false);
        assert_eq!(config.scan_duration_secs, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            enable_autoconnect: true,
            scan_duration_secs: 10,
        };

        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        assert!(toml_str.contains("enable_autoconnect = true"));
        assert!(toml_str.contains("scan_duration_secs = 10"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            enable_autoconnect = true
            scan_duration_secs = 3
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(config.enable_autoconnect, true);
        assert_eq!(config.scan_duration_secs, 3);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hrv-monitor").join("config.toml");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config.enable_autoconnect, false);
        assert!(path.exists());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            enable_autoconnect: true,
            scan_duration_secs: 8,
        };
        config.save_to(&path).expect("Failed to save config");

        let loaded = Config::load_from(&path).expect("Failed to reload config");
        assert_eq!(loaded.enable_autoconnect, true);
        assert_eq!(loaded.scan_duration_secs, 8);
    }
}
