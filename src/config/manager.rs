//! Settings manager for loading and saving user settings
//!
//! This module provides functionality to load and save user settings to
//! %APPDATA%\claude-notch-windows\settings.json with atomic writes to prevent corruption.

use crate::config::models::{SettingKey, UserSettings};
use crate::error::{NotchError, Result, StringError};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name under %APPDATA% shared by settings, stats and logs
pub const APP_DIR_NAME: &str = "claude-notch-windows";

/// Settings manager
///
/// Owns the in-memory settings and the file they are persisted to.
#[derive(Debug)]
pub struct SettingsManager {
    path: PathBuf,
    settings: UserSettings,
}

impl SettingsManager {
    /// Get the application data directory
    ///
    /// Returns: %APPDATA%\claude-notch-windows
    pub fn get_settings_dir() -> PathBuf {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME)
    }

    /// Get the path to the settings file
    ///
    /// Returns: %APPDATA%\claude-notch-windows\settings.json
    pub fn get_settings_path() -> PathBuf {
        Self::get_settings_dir().join("settings.json")
    }

    /// Load settings from the default location
    pub fn load() -> Self {
        Self::load_from(Self::get_settings_path())
    }

    /// Load settings from an explicit path
    ///
    /// A missing or corrupt file yields defaults; invalid keys fall back individually.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let settings = if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(NotchError::from)
                .and_then(|json| serde_json::from_str::<Value>(&json).map_err(NotchError::from))
            {
                Ok(value) => {
                    info!("Settings loaded from {}", path.display());
                    UserSettings::from_json_value(&value)
                }
                Err(e) => {
                    warn!("Failed to load settings, using defaults: {}", e);
                    UserSettings::default()
                }
            }
        } else {
            info!("No settings file found, using defaults");
            UserSettings::default()
        };

        Self { path, settings }
    }

    /// Current settings
    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and store a value, saving when it changed
    ///
    /// Returns whether the value changed. Unchanged values are not written.
    pub fn set(&mut self, key: SettingKey, value: &Value) -> Result<bool> {
        if !self.settings.apply(key, value)? {
            return Ok(false);
        }

        self.save()?;
        info!("Setting changed: {} = {}", key, value);
        Ok(true)
    }

    /// Like [`SettingsManager::set`], with the key given by its settings.json name
    pub fn set_by_name(&mut self, name: &str, value: &Value) -> Result<bool> {
        let key =
            SettingKey::from_name(name).ok_or_else(|| NotchError::UnknownSetting(name.to_string()))?;
        self.set(key, value)
    }

    /// Reset everything to defaults, save, and return the keys that changed
    pub fn reset_to_defaults(&mut self) -> Result<Vec<SettingKey>> {
        let defaults = UserSettings::default();
        let changed: Vec<SettingKey> = SettingKey::ALL
            .into_iter()
            .filter(|key| self.settings.get(*key) != defaults.get(*key))
            .collect();

        self.settings = defaults;
        self.save()?;
        info!("Settings reset to defaults ({} changed)", changed.len());
        Ok(changed)
    }

    /// Save settings to disk with an atomic write
    ///
    /// Writes to a temporary file in the same directory, then renames it over the target.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.settings.to_json_value())?;
        write_atomic(&self.path, json.as_bytes())
            .map_err(|e| NotchError::SettingsError(Box::new(e)))?;
        Ok(())
    }
}

/// Atomically replace `path` with `contents`
///
/// Shared by settings and session stats.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| NotchError::SettingsError(StringError::new("Invalid file path")))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| NotchError::IoError(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{AppdataGuard, create_test_dir};
    use serde_json::json;

    #[test]
    fn test_settings_path() {
        let path = SettingsManager::get_settings_path();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.to_string_lossy().ends_with("settings.json"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = create_test_dir();
        let manager = SettingsManager::load_from(dir.path().join("settings.json"));
        assert_eq!(manager.settings(), &UserSettings::default());
    }

    #[test]
    fn test_load_corrupt_file_uses_defaults() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let manager = SettingsManager::load_from(&path);
        assert_eq!(manager.settings(), &UserSettings::default());
    }

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");

        let mut manager = SettingsManager::load_from(&path);
        assert!(manager.set(SettingKey::IdleTimeout, &json!(45)).unwrap());
        assert!(path.exists());

        let reloaded = SettingsManager::load_from(&path);
        assert_eq!(reloaded.settings().idle_timeout, 45);
    }

    #[test]
    fn test_set_unchanged_does_not_write() {
        let dir = create_test_dir();
        let path = dir.path().join("settings.json");

        let mut manager = SettingsManager::load_from(&path);
        assert!(!manager.set(SettingKey::IdleTimeout, &json!(15)).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_set_invalid_leaves_value() {
        let dir = create_test_dir();
        let mut manager = SettingsManager::load_from(dir.path().join("settings.json"));
        assert!(manager.set(SettingKey::ServerPort, &json!(99_999)).is_err());
        assert_eq!(manager.settings().server_port, 27182);
    }

    #[test]
    fn test_set_by_name_unknown_key() {
        let dir = create_test_dir();
        let mut manager = SettingsManager::load_from(dir.path().join("settings.json"));
        let result = manager.set_by_name("nonexistent_key", &json!(1));
        assert!(matches!(result, Err(NotchError::UnknownSetting(_))));
    }

    #[test]
    fn test_reset_to_defaults_reports_changed_keys() {
        let dir = create_test_dir();
        let mut manager = SettingsManager::load_from(dir.path().join("settings.json"));
        manager.set(SettingKey::IdleTimeout, &json!(30)).unwrap();
        manager.set(SettingKey::Theme, &json!("light")).unwrap();

        let changed = manager.reset_to_defaults().unwrap();
        assert_eq!(changed, vec![SettingKey::IdleTimeout, SettingKey::Theme]);
        assert_eq!(manager.settings(), &UserSettings::default());
    }

    #[test]
    fn test_load_uses_appdata() {
        let dir = create_test_dir();
        let _guard = AppdataGuard::new(&dir);

        let mut manager = SettingsManager::load();
        manager.set(SettingKey::MiniMode, &json!(true)).unwrap();

        let expected = dir.path().join(APP_DIR_NAME).join("settings.json");
        assert!(expected.exists());
        assert!(SettingsManager::load().settings().mini_mode);
    }

    #[test]
    fn test_write_atomic_leaves_no_temp_files() {
        let dir = create_test_dir();
        let path = dir.path().join("nested").join("data.json");
        write_atomic(&path, b"{}").unwrap();
        write_atomic(&path, b"{\"a\":1}").unwrap();

        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}");
    }
}
