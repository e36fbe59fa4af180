//! Configuration management for daemon mode
//!
//! Handles TOML configuration parsing, validation and directory setup

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_SOCKET_PATH, DEFAULT_STORAGE_DIR, DEFAULT_VPN_STORAGE_DIR, DIR_MODE,
};
use crate::storage::paths::StoragePaths;

/// Main daemon configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfiguration {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub daemon: DaemonSettings,
}

/// Where settings documents live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSettings {
    /// Storage root holding one directory per service/provider
    pub storage_dir: PathBuf,
    /// Root of the read-only VPN provider configuration files
    pub vpn_storage_dir: PathBuf,
}

/// Core daemon runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonSettings {
    /// Unix socket the daemon answers queries on
    pub socket_path: PathBuf,
    /// off, error, warn, info, debug or trace
    pub log_level: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            vpn_storage_dir: PathBuf::from(DEFAULT_VPN_STORAGE_DIR),
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            log_level: "info".to_string(),
        }
    }
}

impl DaemonConfiguration {
    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DaemonConfiguration = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, path) in [
            ("storage.storage_dir", &self.storage.storage_dir),
            ("storage.vpn_storage_dir", &self.storage.vpn_storage_dir),
            ("daemon.socket_path", &self.daemon.socket_path),
        ] {
            if !path.is_absolute() {
                bail!("{} must be an absolute path, got '{}'", key, path.display());
            }
        }

        if LevelFilter::from_str(&self.daemon.log_level).is_err() {
            bail!("daemon.log_level: invalid log level '{}'", self.daemon.log_level);
        }

        Ok(())
    }

    pub fn log_filter(&self) -> LevelFilter {
        LevelFilter::from_str(&self.daemon.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn storage_paths(&self) -> StoragePaths {
        StoragePaths::new(&self.storage.storage_dir, &self.storage.vpn_storage_dir)
    }

    /// Create the storage roots when missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.storage.storage_dir, &self.storage.vpn_storage_dir] {
            DirBuilder::new()
                .recursive(true)
                .mode(DIR_MODE)
                .create(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}
