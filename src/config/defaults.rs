// src/config/defaults.rs
use std::path::PathBuf;

use crate::config::app::{Config, CreateDefaults, Paths};
use crate::consts::{CONFIG_DIR_NAME, DEFAULT_KEY_DERIVATION_ROUNDS};
use crate::enums::{CipherAlgorithm, DatabaseType};
use crate::settings::ViewSettings;

pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub fn default_create() -> CreateDefaults {
    CreateDefaults {
        database_type: DatabaseType::CurrentFormat,
        cipher_algorithm: CipherAlgorithm::Aes256,
        key_derivation_rounds: DEFAULT_KEY_DERIVATION_ROUNDS,
    }
}

pub fn default_paths() -> Paths {
    Paths {
        settings_file: config_dir().map(|dir| dir.join(SETTINGS_FILE_NAME)),
    }
}

pub fn default_config() -> Config {
    Config {
        create: default_create(),
        view: ViewSettings::default(),
        paths: default_paths(),
    }
}

/// `<platform config dir>/vault-session`, if the platform has one
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
}
