//! File-backed [`ConfigStore`] with change notification.
//!
//! Every write replaces the whole config, persists it, and only then
//! announces which field changed. Listeners read the new value back from the
//! store rather than from the notification.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use super::config::Config;
use crate::error::Result;
use crate::places::{TrustedPlace, TrustedPlaceSet};
use crate::platform::{ConfigChange, ConfigStore};
use crate::threshold::SensitivityLevel;

const CHANGE_CAPACITY: usize = 16;

pub struct SettingsStore {
    config: Mutex<Config>,
    /// `None` keeps everything in memory.
    path: Option<PathBuf>,
    changes: broadcast::Sender<ConfigChange>,
}

impl SettingsStore {
    /// Open the store at the default location, creating defaults if needed.
    pub fn open() -> Result<Self> {
        Self::with_path(Config::default_path()?)
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        Ok(Self::build(config, Some(path)))
    }

    pub fn in_memory(config: Config) -> Self {
        Self::build(config, None)
    }

    fn build(config: Config, path: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            config: Mutex::new(config),
            path,
            changes,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> Config {
        self.lock().clone()
    }

    /// Set a value by dot-separated key and persist.
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.update(|cfg| Ok(cfg.set(key, value)?))?;
        match key {
            "sensitivity_level" => self.notify(ConfigChange::Sensitivity),
            "trusted_places" => self.notify(ConfigChange::TrustedPlaces),
            _ => {}
        }
        Ok(())
    }

    /// Restore defaults and persist.
    pub fn reset(&self) -> Result<()> {
        self.update(|cfg| {
            *cfg = Config::default();
            Ok(())
        })?;
        self.notify(ConfigChange::Sensitivity);
        self.notify(ConfigChange::TrustedPlaces);
        Ok(())
    }

    /// Append a place; returns its index.
    pub fn add_place(&self, place: TrustedPlace) -> Result<usize> {
        self.edit_places(|places| Ok(places.add(place)))
    }

    pub fn rename_place(&self, index: usize, label: &str) -> Result<()> {
        self.edit_places(|places| Ok(places.rename(index, label)?))
    }

    pub fn remove_place(&self, index: usize) -> Result<TrustedPlace> {
        self.edit_places(|places| Ok(places.remove(index)?))
    }

    fn edit_places<T>(&self, f: impl FnOnce(&mut TrustedPlaceSet) -> Result<T>) -> Result<T> {
        let out = self.update(|cfg| f(&mut cfg.trusted_places))?;
        self.notify(ConfigChange::TrustedPlaces);
        Ok(out)
    }

    /// Apply `f` to a copy, persist it, then swap it in. On any error the
    /// stored config is untouched.
    fn update<T>(&self, f: impl FnOnce(&mut Config) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        next.validate()?;
        if let Some(path) = &self.path {
            next.save_to(path)?;
        }
        *guard = next;
        Ok(out)
    }

    fn notify(&self, change: ConfigChange) {
        // No listeners while disarmed.
        let _ = self.changes.send(change);
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for SettingsStore {
    fn sensitivity(&self) -> f64 {
        self.lock().sensitivity_level
    }

    fn set_sensitivity(&self, level: f64) -> Result<()> {
        let level = SensitivityLevel::new(level)?;
        self.update(|cfg| {
            cfg.sensitivity_level = level.value();
            Ok(())
        })?;
        self.notify(ConfigChange::Sensitivity);
        Ok(())
    }

    fn trusted_places(&self) -> TrustedPlaceSet {
        self.lock().trusted_places.clone()
    }

    fn set_trusted_places(&self, places: TrustedPlaceSet) -> Result<()> {
        self.edit_places(|current| {
            *current = places;
            Ok(())
        })
    }

    fn location_interval(&self) -> Duration {
        Duration::from_secs(self.lock().location_interval_secs)
    }

    fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.changes.subscribe()
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
