// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};
use crate::naming::TimestampFormat;
use crate::tool::SystemTool;

pub const CONFIG_ENV: &str = "BTRFS_SNAPSHOTS_CONFIG";
const APP_DIR: &str = "btrfs-snapshots";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LoggingLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LoggingLevel::Error => "error",
            LoggingLevel::Warn => "warn",
            LoggingLevel::Info => "info",
            LoggingLevel::Debug => "debug",
            LoggingLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Explicit btrfs executable; looked up on `PATH` when unset.
    pub btrfs_path: Option<PathBuf>,
    pub timestamp_format: TimestampFormat,
    pub readonly_snapshots: bool,
    pub log_level: LoggingLevel,
    pub log_to_disk: bool,
}

impl Config {
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|error| SnapshotError::Config {
            path: origin.to_path_buf(),
            reason: error.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|error| SnapshotError::Config {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

        let config = Self::from_toml_str(&raw, path)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve configuration: an explicit path, then `$BTRFS_SNAPSHOTS_CONFIG`,
    /// then the per-user default file.
    ///
    /// Explicit and environment paths must exist. A missing default file
    /// yields [`Config::default`].
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
            return Self::load(Path::new(&path));
        }

        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn tool(&self) -> Result<SystemTool> {
        match &self.btrfs_path {
            Some(path) => Ok(SystemTool::new(path)),
            None => SystemTool::locate(),
        }
    }
}

pub fn default_path() -> Option<PathBuf> {
    if let Some(xdg_config) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE));
    }

    std::env::var_os("HOME").map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE)
    })
}
