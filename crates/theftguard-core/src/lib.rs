//! # theftguard Core Library
//!
//! Decides whether a handheld device is being moved without authorization and,
//! if so, asks the host to lock it. Three independently-updating signals feed
//! the decision: accelerometer magnitude, proximity to trusted locations, and
//! association with trusted Wi-Fi networks.
//!
//! ## Architecture
//!
//! - **Threshold**: sensitivity level → motion threshold, fixed per arming
//! - **Trust**: geofence (50 m) and exact-SSID matching against trusted places
//! - **Engine**: event-driven protection state machine behind a single mutex,
//!   plus a [`Guardian`] that wires it to host collaborators
//! - **Storage**: TOML configuration with change notification
//!
//! ## Key Components
//!
//! - [`ProtectionMachine`]: the single-threaded state machine
//! - [`ProtectionService`]: thread-safe front that invokes the lock actuator
//! - [`SettingsStore`]: persisted sensitivity and trusted places
//! - [`LockActuator`], [`LocationProvider`], [`WifiStatusProvider`],
//!   [`ConfigStore`]: traits the host implements

pub mod engine;
pub mod error;
pub mod events;
pub mod places;
pub mod platform;
pub mod sensor;
pub mod storage;
pub mod threshold;
pub mod trust;

pub use engine::{Guardian, ProtectionMachine, ProtectionMode, ProtectionService, ProtectionState};
pub use error::{ConfigError, CoreError, PlatformError, ValidationError};
pub use events::Event;
pub use places::{GeoPoint, PlaceKind, TrustedPlace, TrustedPlaceSet};
pub use platform::{
    ConfigChange, ConfigStore, LocationProvider, LocationSink, LockActuator, WifiStatusProvider,
};
pub use sensor::AccelSample;
pub use storage::{Config, SettingsStore};
pub use threshold::{compute_threshold, MotionThreshold, SensitivityLevel};
pub use trust::{is_trusted, EvaluationContext, WifiState};
