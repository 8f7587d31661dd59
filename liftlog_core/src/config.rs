//! Configuration file support for liftlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftlog/config.toml`.

use crate::generator::GeneratorConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub generator: GeneratorSettings,

    #[serde(default)]
    pub backup: BackupConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seed the built-in exercise catalog on first launch
    #[serde(default = "default_true")]
    pub seed_exercises: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seed_exercises: true,
        }
    }
}

/// Mock data generator defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorSettings {
    #[serde(default = "default_workout_count")]
    pub workout_count: usize,

    #[serde(default = "default_cardio_count")]
    pub cardio_count: usize,

    #[serde(default = "default_date_range_days")]
    pub date_range_days: u32,

    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            workout_count: default_workout_count(),
            cardio_count: default_cardio_count(),
            date_range_days: default_date_range_days(),
            seed: None,
        }
    }
}

impl GeneratorSettings {
    pub fn to_generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            workout_count: self.workout_count,
            cardio_count: self.cardio_count,
            date_range_days: self.date_range_days,
        }
    }
}

/// Backup export configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct BackupConfig {
    /// Where `export` writes when no path is given; defaults to the data dir
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("liftlog")
}

fn default_true() -> bool {
    true
}

fn default_workout_count() -> usize {
    GeneratorConfig::default().workout_count
}

fn default_cardio_count() -> usize {
    GeneratorConfig::default().cardio_count
}

fn default_date_range_days() -> u32 {
    GeneratorConfig::default().date_range_days
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("liftlog").join("config.toml")
    }

    /// Directory backups are written to by default
    pub fn backup_dir(&self) -> PathBuf {
        self.backup
            .dir
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("backups"))
    }

    fn validate(&self) -> Result<()> {
        if self.generator.date_range_days == 0 {
            return Err(Error::Config(
                "generator.date_range_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
