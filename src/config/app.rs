// src/config/app.rs
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::defaults::{
    config_dir, default_config, default_create, default_paths, CONFIG_FILE_NAME,
};
use crate::consts::CONFIG_ENV_VAR;
use crate::enums::{CipherAlgorithm, DatabaseType};
use crate::error::ConfigError;
use crate::settings::ViewSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_create")]
    pub create: CreateDefaults,
    #[serde(default)]
    pub view: ViewSettings,
    #[serde(default = "default_paths")]
    pub paths: Paths,
}

/// Parameters handed to the engine when a new database is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDefaults {
    pub database_type: DatabaseType,
    pub cipher_algorithm: CipherAlgorithm,
    pub key_derivation_rounds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paths {
    /// Where view settings are persisted; `None` keeps them in memory
    pub settings_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load config once per process, falling back to defaults if missing or invalid
pub fn load() -> &'static Config {
    CONFIG.get_or_init(|| {
        let config_path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .or_else(|| config_dir().map(|dir| dir.join(CONFIG_FILE_NAME)));

        let Some(path) = config_path.filter(|p| p.exists()) else {
            debug!("no config file found, using built-in defaults");
            return default_config();
        };

        match Config::from_path(&path) {
            Ok(conf) => {
                debug!(path = %path.display(), "loaded config");
                conf
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring invalid config file");
                default_config()
            }
        }
    })
}
