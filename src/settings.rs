// src/settings.rs
//! Client-side view preferences and their persistence
//!
//! These booleans are not tied to the session state. They are applied on the
//! caller side immediately, persisted through a [`SettingsStore`], and
//! mirrored to the storage engine fire-and-forget.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub show_credentials_in_list: bool,
    pub sort_alphabetically: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_credentials_in_list: true,
            sort_alphabetically: true,
        }
    }
}

impl ViewSettings {
    pub fn apply(&mut self, setting: ViewSetting) {
        match setting {
            ViewSetting::ShowCredentialsInList(value) => self.show_credentials_in_list = value,
            ViewSetting::SortAlphabetically(value) => self.sort_alphabetically = value,
        }
    }

    /// Every setting as an individual change, used to mirror the full set
    pub fn as_changes(&self) -> [ViewSetting; 2] {
        [
            ViewSetting::ShowCredentialsInList(self.show_credentials_in_list),
            ViewSetting::SortAlphabetically(self.sort_alphabetically),
        ]
    }
}

/// A single view preference change, as mirrored to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSetting {
    ShowCredentialsInList(bool),
    SortAlphabetically(bool),
}

/// Persistence collaborator for view settings
pub trait SettingsStore: Send {
    /// Returns `Ok(None)` when nothing has been stored yet
    fn load(&self) -> Result<Option<ViewSettings>, SettingsError>;

    fn save(&mut self, settings: &ViewSettings) -> Result<(), SettingsError>;
}

/// In-memory store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    stored: Option<ViewSettings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(settings: ViewSettings) -> Self {
        Self {
            stored: Some(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Option<ViewSettings>, SettingsError> {
        Ok(self.stored)
    }

    fn save(&mut self, settings: &ViewSettings) -> Result<(), SettingsError> {
        self.stored = Some(*settings);
        Ok(())
    }
}

/// Stores settings as a small TOML file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<Option<ViewSettings>, SettingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    fn save(&mut self, settings: &ViewSettings) -> Result<(), SettingsError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let content = toml::to_string_pretty(settings)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}
