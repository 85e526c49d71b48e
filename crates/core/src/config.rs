//! Application configuration: defaults, an optional TOML file and
//! `AOEXP__*` environment overrides.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::market::MarketSettings;

/// Directory under the platform config/data roots owned by this tool.
pub const APP_DIR: &str = "aoexp";

/// File name of the catalog for the only supported edition.
pub const CATALOG_FILE: &str = "units_buildings_techs.de.json";

const ENV_PREFIX: &str = "AOEXP";

const DEFAULT_CONFIG: &str = r#"# aoexp configuration
#
# Every key is optional; environment variables such as
# AOEXP__PRIVACY=true or AOEXP__MARKET__STEP=3 take precedence.

# Path to the halfon units/buildings/techs catalog.
# catalog_path = "/path/to/units_buildings_techs.de.json"

# Replace human player names with P<n>.
# privacy = false

# Append logs to this file in addition to stderr.
# log_file = "/tmp/aoexp.log"

[market]
# starting_wood = 100.0
# starting_food = 100.0
# starting_stone = 130.0
# default_fee = 0.3
# guilds_fee = 0.15
# step = 3.0
# floor = 25.0
# lot_size = 100.0
# guilds_technology_id = 15
"#;

/// Runtime configuration shared by the CLI and the recording pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Location of the static cost catalog.
    pub catalog_path: PathBuf,
    /// Hide human player names behind their slot number.
    pub privacy: bool,
    /// Optional log file appended to by the CLI.
    pub log_file: Option<PathBuf>,
    /// Market simulation constants.
    pub market: MarketSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            privacy: false,
            log_file: None,
            market: MarketSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default config file location.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load configuration layering `path` (if present) and the environment
    /// over the built-in defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }
}

/// Default location of the configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_catalog_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CATALOG_FILE)
}

/// Write a commented default configuration file if none exists yet.
/// Returns the path when a file was written.
pub fn ensure_default_config() -> Result<Option<PathBuf>> {
    let path = config_path();
    Ok(write_default_config(&path)?.then_some(path))
}

fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
