//! # Configuration Management
//!
//! Loads the host-side settings from `dotmatrix-config.toml`: how many zones
//! to expect, where the settings slots live and which template variables the
//! zone texts may reference.

use crate::codec::ExpectedZones;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "dotmatrix-config.toml";

/// Application configuration loaded from dotmatrix-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub display: DisplayConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Zones to expect, -1 to take whatever the saved settings hold.
    /// Rewritten by every settings save from the form.
    pub zone_count: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one file per settings slot
    pub dir: PathBuf,
    pub slot: u16,
}

/// Values for `%name%` placeholders in zone text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: DisplayConfig { zone_count: 1 },
            storage: StorageConfig {
                dir: PathBuf::from("settings"),
                slot: 0,
            },
            templates: TemplateConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from dotmatrix-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        zones = config.display.zone_count,
                        "loaded configuration"
                    );
                    config
                }
                Err(e) => {
                    warn!("invalid config file format: {e}");
                    warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    pub fn expected_zones(&self) -> ExpectedZones {
        ExpectedZones::from_raw(self.display.zone_count)
    }
}
