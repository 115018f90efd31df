//! Persistent settings, stored as a flat TOML table.

use anyhow::{Context, Result};
use macrorec_core::{SettingValue, Settings};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Which injection backend to play with
pub const BACKEND_KEY: &str = "backend";
/// Minimum spacing of recorded pointer moves, in milliseconds
pub const MOVE_INTERVAL_KEY: &str = "move_interval_ms";

#[derive(Debug)]
pub struct SettingsFile {
    path: PathBuf,
    values: BTreeMap<String, SettingValue>,
}

impl SettingsFile {
    /// `<config dir>/macrorec/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("macrorec").join("settings.toml"))
    }

    /// Read settings from `path`. A missing file is the same as an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        let values = match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("malformed settings file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("could not read {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("could not create {}", dir.display()))?;
        }
        let raw = toml::to_string(&self.values).context("could not serialize settings")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("could not write {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored values, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Settings for SettingsFile {
    fn get(&self, key: &str, default: SettingValue) -> SettingValue {
        self.values.get(key).cloned().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_owned(), value);
    }
}
