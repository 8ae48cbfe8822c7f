use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

const CONFIG_FILE: &str = "settings.toml";
const APP_NAME: &str = "peek";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enable_background_translucency: bool,
    pub copy_destination_folder: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_background_translucency: true,
            copy_destination_folder: String::new(),
        }
    }
}

impl Settings {
    /// The configured copy destination, if one is set.
    pub fn copy_destination(&self) -> Option<PathBuf> {
        let trimmed = self.copy_destination_folder.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

/// Reads settings from `path`. A missing file gives defaults; so does a file
/// that no longer parses, with a warning.
pub fn load_from_path(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            log::warn!("Ignoring unreadable settings {}: {}", path.display(), e);
            Ok(Settings::default())
        }
    }
}

pub fn save_to_path(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

/// Settings plus where they live. `path` is `None` when the platform has no
/// config directory; changes then only last for the session.
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Settings,
}

impl SettingsStore {
    pub fn open(path: Option<PathBuf>) -> Self {
        let settings = match &path {
            Some(p) => load_from_path(p).unwrap_or_else(|e| {
                log::warn!("Could not read settings {}: {}", p.display(), e);
                Settings::default()
            }),
            None => Settings::default(),
        };
        log::debug!("Settings loaded: {:?}", settings);
        Self { path, settings }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn set_background_translucency(&mut self, enabled: bool) -> Result<()> {
        self.settings.enable_background_translucency = enabled;
        self.persist()
    }

    pub fn set_copy_destination(&mut self, folder: &Path) -> Result<()> {
        self.settings.copy_destination_folder = folder.to_string_lossy().into_owned();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match &self.path {
            Some(p) => save_to_path(&self.settings, p),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_enable_translucency_without_destination() {
        let settings = Settings::default();
        assert!(settings.enable_background_translucency);
        assert_eq!(settings.copy_destination(), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.toml");
        let settings = Settings {
            enable_background_translucency: false,
            copy_destination_folder: "/srv/keep".into(),
        };

        save_to_path(&settings, &path).expect("save");
        assert_eq!(load_from_path(&path).expect("load"), settings);
    }

    #[test]
    fn missing_and_invalid_files_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        assert_eq!(load_from_path(&path).expect("missing"), Settings::default());

        fs::write(&path, "not = valid = toml").expect("write");
        assert_eq!(load_from_path(&path).expect("invalid"), Settings::default());
    }

    #[test]
    fn partial_files_keep_defaults_for_absent_keys() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "copy_destination_folder = \"/tmp/out\"\n").expect("write");

        let loaded = load_from_path(&path).expect("load");
        assert!(loaded.enable_background_translucency);
        assert_eq!(loaded.copy_destination(), Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn store_persists_every_change() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        let mut store = SettingsStore::open(Some(path.clone()));

        store.set_background_translucency(false).expect("set");
        store.set_copy_destination(dir.path()).expect("set");

        let reopened = SettingsStore::open(Some(path));
        assert!(!reopened.get().enable_background_translucency);
        assert_eq!(reopened.get().copy_destination(), Some(dir.path().to_path_buf()));
    }
}
