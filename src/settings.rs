use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::timer::{run_clock::DEFAULT_WARNING_THRESHOLD_SEC, ControllerOptions};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const MIN_TICK_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BellSettings {
    pub enabled: bool,
    pub volume: f32,
}

impl Default for BellSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    /// Default for meetings created with `new`.
    pub auto_transition: bool,
    pub warning_threshold_sec: u64,
    pub tick_interval_ms: u64,
    pub bell: BellSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            auto_transition: false,
            warning_threshold_sec: DEFAULT_WARNING_THRESHOLD_SEC,
            tick_interval_ms: 250,
            bell: BellSettings::default(),
        }
    }
}

impl UserSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(MIN_TICK_INTERVAL_MS))
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            tick_interval: self.tick_interval(),
            warning_threshold_sec: self.warning_threshold_sec,
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Loads `path`, falling back to defaults when the file is missing or unparsable.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Result<UserSettings> {
        Ok(self.read()?.clone())
    }

    pub fn update_bell(&self, bell: BellSettings) -> Result<()> {
        self.update(|settings| settings.bell = bell)
    }

    pub fn set_auto_transition(&self, enabled: bool) -> Result<()> {
        self.update(|settings| settings.auto_transition = enabled)
    }

    pub fn set_warning_threshold(&self, seconds: u64) -> Result<()> {
        self.update(|settings| settings.warning_threshold_sec = seconds)
    }

    fn update(&self, apply: impl FnOnce(&mut UserSettings)) -> Result<()> {
        let mut guard = self.write()?;
        apply(&mut guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, UserSettings>> {
        self.data
            .read()
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, UserSettings>> {
        self.data
            .write()
            .map_err(|_| anyhow!("settings lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.get().unwrap();

        assert_eq!(settings, UserSettings::default());
        assert_eq!(settings.warning_threshold_sec, 300);
        assert_eq!(settings.tick_interval(), Duration::from_millis(250));
        assert!(settings.bell.enabled);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "autoTransition": true, "tickIntervalMs": 10 }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().get().unwrap();
        assert!(settings.auto_transition);
        assert_eq!(settings.warning_threshold_sec, 300);
        assert_eq!(settings.tick_interval(), Duration::from_millis(MIN_TICK_INTERVAL_MS));

        let options = settings.controller_options();
        assert_eq!(options.warning_threshold_sec, 300);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.get().unwrap(), UserSettings::default());
    }

    #[test]
    fn updates_are_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        store
            .update_bell(BellSettings {
                enabled: false,
                volume: 0.2,
            })
            .unwrap();
        store.set_warning_threshold(120).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"warningThresholdSec\": 120"));

        let reopened = SettingsStore::new(path).unwrap().get().unwrap();
        assert!(!reopened.bell.enabled);
        assert_eq!(reopened.warning_threshold_sec, 120);
    }
}
