//! # Application Configuration
//!
//! A single YAML file, created with defaults on first start.
//!
//! ```yaml
//! data_directory: /home/ana/.local/share/gastro-tracker
//! bind_address: 127.0.0.1:3000
//! app_name: gastro_tracker
//! schema_version: 1
//! reminders:
//!   window_days: 7
//!   check_interval_secs: 3600
//! remote_timeout_secs: 15
//! cloud_backup:
//!   folder_name: GastroTrackerBackups
//!   file_store_root: null
//! contact: null
//! ```
//!
//! Lookup: `$GASTRO_CONFIG`, else `<data dir>/gastro_config.yaml`.
//! `GASTRO_DATA_DIR` and `GASTRO_BIND` override the file.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::contact_service::ContactConfig;

pub const CONFIG_ENV: &str = "GASTRO_CONFIG";
pub const DATA_DIR_ENV: &str = "GASTRO_DATA_DIR";
pub const BIND_ENV: &str = "GASTRO_BIND";
pub const CONFIG_FILE_NAME: &str = "gastro_config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// The reminder becomes due when this many days or fewer remain in the month
    pub window_days: u32,
    pub check_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            check_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudBackupConfig {
    pub folder_name: String,
    /// Directory that plays the remote file store; `<data dir>/cloud_files` when unset
    pub file_store_root: Option<PathBuf>,
}

impl Default for CloudBackupConfig {
    fn default() -> Self {
        Self {
            folder_name: "GastroTrackerBackups".to_string(),
            file_store_root: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_directory: PathBuf,
    pub bind_address: String,
    pub app_name: String,
    pub schema_version: u32,
    pub reminders: ReminderConfig,
    pub remote_timeout_secs: u64,
    pub cloud_backup: CloudBackupConfig,
    pub contact: Option<ContactConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            bind_address: "127.0.0.1:3000".to_string(),
            app_name: "gastro_tracker".to_string(),
            schema_version: 1,
            reminders: ReminderConfig::default(),
            remote_timeout_secs: 15,
            cloud_backup: CloudBackupConfig::default(),
            contact: None,
        }
    }
}

/// Platform data directory, e.g. `~/.local/share/gastro-tracker`
pub fn default_data_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gastro-tracker")
}

impl AppConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for environment variables
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir_override = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let data_directory = data_dir_override.clone().unwrap_or_else(default_data_directory);
        let path = lookup(CONFIG_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_directory.join(CONFIG_FILE_NAME));

        let mut config = Self::read_or_create(&path, &data_directory)?;

        if let Some(dir) = data_dir_override {
            config.data_directory = dir;
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.trim().is_empty()) {
            config.bind_address = bind;
        }
        Ok(config)
    }

    fn read_or_create(path: &Path, data_directory: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
            let config: AppConfig =
                serde_yaml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))?;
            debug!("Loaded configuration from {}", path.display());
            return Ok(config);
        }

        let config = AppConfig {
            data_directory: data_directory.to_path_buf(),
            ..Default::default()
        };
        config.save(path)?;
        info!("📝 Created default configuration at {}", path.display());
        Ok(config)
    }

    /// Write the configuration atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    pub fn file_store_root(&self) -> PathBuf {
        self.cloud_backup
            .file_store_root
            .clone()
            .unwrap_or_else(|| self.data_directory.join("cloud_files"))
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_secs(self.reminders.check_interval_secs.max(1))
    }
}
