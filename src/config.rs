use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::TrackerError;
use crate::logging::LogConfig;
use crate::pipeline::TrackerConfig;
use crate::session::SessionOptions;
use crate::source::PeripheralSettings;

/// Application configuration, one TOML section per concern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metadata: ConfigMetadata,

    /// Estimator calibration
    pub tracker: TrackerConfig,

    /// Live display refresh and chart settings
    pub display: DisplaySettings,

    /// BLE peripheral selection
    pub peripheral: PeripheralSettings,

    /// Where completed workouts are kept
    pub storage: StorageSettings,

    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    pub version: String,

    pub created_at: DateTime<Utc>,

    /// Stamped on every save
    pub updated_at: DateTime<Utc>,
}

/// Live display settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Metrics refresh period (ms)
    pub tick_ms: u64,

    /// Number of recent points per chart
    pub series_capacity: usize,
}

/// Workout storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the per-user workout files
    pub data_dir: PathBuf,

    /// User the workouts are recorded for
    pub user_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            metadata: ConfigMetadata::default(),
            tracker: TrackerConfig::default(),
            display: DisplaySettings::default(),
            peripheral: PeripheralSettings::default(),
            storage: StorageSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            tick_ms: 250,
            series_capacity: 64,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            data_dir: PathBuf::from("./data"),
            user_id: "local".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Write as TOML, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// `~/.rowtrack/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rowtrack")
            .join("config.toml")
    }

    /// Load `path` when it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.as_ref().display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> std::result::Result<(), TrackerError> {
        self.tracker.validate()?;
        if self.display.tick_ms == 0 {
            return Err(TrackerError::Configuration(
                "display.tick_ms must be greater than 0".to_string(),
            ));
        }
        if self.display.series_capacity == 0 {
            return Err(TrackerError::Configuration(
                "display.series_capacity must be greater than 0".to_string(),
            ));
        }
        if self.storage.user_id.trim().is_empty() {
            return Err(TrackerError::Configuration(
                "storage.user_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Options for a new tracking session
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            tracker: self.tracker,
            series_capacity: self.display.series_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(deserialized.tracker, config.tracker);
        assert_eq!(deserialized.display, config.display);
        assert_eq!(deserialized.peripheral, config.peripheral);
        assert_eq!(deserialized.storage, config.storage);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [tracker]
            distance_scale = 0.25

            [storage]
            user_id = "erg-club"
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.distance_scale, 0.25);
        assert_eq!(config.tracker.damp, 0.92);
        assert_eq!(config.storage.user_id, "erg-club");
        assert_eq!(config.storage.data_dir, PathBuf::from("./data"));
        assert_eq!(config.display.tick_ms, 250);
        assert_eq!(config.peripheral.device_name, "Nano33BLE");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.display.series_capacity = 128;
        config.save_to_file(&config_path).unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.display.series_capacity, 128);
        assert_eq!(loaded.session_options().series_capacity, 128);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("absent.toml");
        let config = AppConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.tracker, TrackerConfig::default());
        assert!(!missing.exists());

        let present = temp_dir.path().join("config.toml");
        fs::write(&present, "[display]\ntick_ms = 100\n").unwrap();
        assert_eq!(AppConfig::load_or_default(&present).unwrap().display.tick_ms, 100);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[tracker]\ndamp = 1.5\n").unwrap();

        let err = AppConfig::load_from_file(&config_path).unwrap_err();
        assert!(format!("{:#}", err).contains("damp"));

        let mut config = AppConfig::default();
        config.display.tick_ms = 0;
        assert!(matches!(config.validate(), Err(TrackerError::Configuration(_))));
    }
}
