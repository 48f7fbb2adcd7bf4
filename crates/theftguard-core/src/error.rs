//! Core error types for theftguard-core.
//!
//! None of these are fatal to the engine itself: the protection state machine
//! resolves every condition to "protection remains active". They surface at the
//! edges, where configuration is loaded, trusted places are edited, or a
//! collaborator reports that a capability is missing.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for theftguard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Platform collaborator errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Could not determine the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Sensitivity outside the supported range
    #[error("Sensitivity level {0} is outside 1.0..=5.0")]
    SensitivityOutOfRange(f64),

    /// Coordinates outside the WGS84 range
    #[error("Invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// Blank label
    #[error("Label cannot be empty")]
    EmptyLabel,

    /// SSID that can never identify a network
    #[error("Not connected to a Wi-Fi network")]
    UnusableSsid,

    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },
}

/// Errors reported by host-platform collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// The lock capability is not active
    #[error("Lock actuator unavailable: {0}")]
    ActuatorUnavailable(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
