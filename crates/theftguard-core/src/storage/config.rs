//! TOML-based application configuration.
//!
//! Stores:
//! - Sensitivity level (1.0 least sensitive .. 5.0 most sensitive)
//! - Location update cadence
//! - The trusted-place list, persisted as a whole
//!
//! Configuration is stored at `~/.config/theftguard/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::places::TrustedPlaceSet;
use crate::threshold::{SensitivityLevel, DEFAULT_SENSITIVITY};

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/theftguard/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_sensitivity")]
    pub sensitivity_level: f64,
    #[serde(default = "default_location_interval_secs")]
    pub location_interval_secs: u64,
    #[serde(default)]
    pub trusted_places: TrustedPlaceSet,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY
}
fn default_location_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensitivity_level: default_sensitivity(),
            location_interval_secs: default_location_interval_secs(),
            trusted_places: TrustedPlaceSet::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from `path`, writing defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                Ok(cfg.normalized())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load, falling back to defaults on any error.
    /// Malformed persisted data is treated as "nothing configured".
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            Self::default()
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if the key is
    /// unknown or the resulting config is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    pub fn sensitivity(&self) -> SensitivityLevel {
        SensitivityLevel::clamped(self.sensitivity_level)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        SensitivityLevel::new(self.sensitivity_level).map_err(|e| ConfigError::InvalidValue {
            key: "sensitivity_level".into(),
            message: e.to_string(),
        })?;
        if self.location_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "location_interval_secs".into(),
                message: "must be at least 1 second".into(),
            });
        }
        for (index, place) in self.trusted_places.iter().enumerate() {
            place.validate().map_err(|e| ConfigError::InvalidValue {
                key: format!("trusted_places.{index}"),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Pull hand-edited values back into range.
    fn normalized(mut self) -> Self {
        let clamped = SensitivityLevel::clamped(self.sensitivity_level).value();
        if clamped != self.sensitivity_level {
            tracing::warn!(
                stored = self.sensitivity_level,
                clamped,
                "Sensitivity out of range; clamping"
            );
            self.sensitivity_level = clamped;
        }
        self.location_interval_secs = self.location_interval_secs.max(1);
        self.trusted_places = self
            .trusted_places
            .iter()
            .filter(|place| match place.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(label = place.label(), error = %e, "Dropping invalid trusted place");
                    false
                }
            })
            .cloned()
            .collect();
        self
    }
}
