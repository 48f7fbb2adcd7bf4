mod config;
mod settings;

pub use config::Config;
pub use settings::SettingsStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/theftguard[-dev]/` based on THEFTGUARD_ENV.
///
/// Set THEFTGUARD_ENV=dev to use the development data directory, or
/// THEFTGUARD_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("THEFTGUARD_CONFIG_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("THEFTGUARD_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("theftguard-dev")
            } else {
                base_dir.join("theftguard")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
