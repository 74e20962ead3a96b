//! Dashboard configuration loaded from an optional TOML file.

use crate::data::processor::FillStrategy;
use crate::data::sample::SampleParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "RENEWABLE_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 850.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub remove_duplicates: bool,
    pub fill_strategy: FillStrategy,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            fill_strategy: FillStrategy::Mean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chart_width: 1000,
            chart_height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub window: WindowConfig,
    pub sample: SampleParams,
    pub cleaning: CleaningConfig,
    pub export: ExportConfig,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            sample: SampleParams::default(),
            cleaning: CleaningConfig::default(),
            export: ExportConfig::default(),
            preview_rows: 5,
        }
    }
}

impl DashboardConfig {
    /// Load from `$RENEWABLE_DASHBOARD_CONFIG` or `./dashboard.toml`.
    ///
    /// A missing file yields defaults. A malformed file is logged and also
    /// yields defaults.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::error!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
