//! Settings loading and parsing (settings.toml)

use anyhow::{Context, Result};
use can_daq_compiler::{CompilerConfig, ScheduleConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application settings (loaded from a TOML file, all tables optional)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub dbc: DbcConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DbcConfig {
    /// Shorten signal names to 29 characters plus a uniqueness suffix
    #[serde(default = "default_shorten")]
    pub shorten_signal_names: bool,
}

fn default_shorten() -> bool {
    true
}

impl Default for DbcConfig {
    fn default() -> Self {
        Self {
            shorten_signal_names: default_shorten(),
        }
    }
}

impl AppConfig {
    /// Library configuration for these settings
    pub fn compiler_config(&self) -> CompilerConfig {
        CompilerConfig {
            schedule: self.schedule.clone(),
            shorten_signal_names: self.dbc.shorten_signal_names,
        }
    }
}

/// Load settings from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    log::debug!("Loaded settings: {:?}", config);
    Ok(config)
}
