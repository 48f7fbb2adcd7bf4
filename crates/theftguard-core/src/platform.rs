//! Host-platform collaborators.
//!
//! The engine never talks to sensors, radios or the OS lock directly. The host
//! implements these traits and hands them to the [`Guardian`](crate::Guardian).
//! Every method is expected to return quickly; none of them is called while
//! the engine's state lock is held.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::error::{PlatformError, Result};
use crate::places::{GeoPoint, TrustedPlaceSet};

/// Callback through which a location provider delivers fixes.
pub type LocationSink = Arc<dyn Fn(GeoPoint) + Send + Sync>;

/// Which persisted field changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    Sensitivity,
    TrustedPlaces,
}

/// Key-value configuration with change notification.
pub trait ConfigStore: Send + Sync {
    /// Stored sensitivity, possibly out of range if the file was hand-edited.
    fn sensitivity(&self) -> f64;

    fn set_sensitivity(&self, level: f64) -> Result<()>;

    fn trusted_places(&self) -> TrustedPlaceSet;

    /// Replace the whole set. There are no partial updates.
    fn set_trusted_places(&self, places: TrustedPlaceSet) -> Result<()>;

    /// Location update cadence requested when protection starts.
    fn location_interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Stream of change notifications, keyed by field.
    fn subscribe(&self) -> broadcast::Receiver<ConfigChange>;
}

/// Periodic location fixes.
pub trait LocationProvider: Send + Sync {
    /// Whether the location capability has been granted. Without it the
    /// engine never subscribes and runs on Wi-Fi and motion alone.
    fn has_permission(&self) -> bool;

    fn request_updates(&self, interval: Duration, sink: LocationSink) -> Result<(), PlatformError>;

    fn remove_updates(&self);

    /// Most recent cached fix, used to seed trust at arm time.
    fn last_known_fix(&self) -> Option<GeoPoint> {
        None // default: no cache
    }
}

/// Current Wi-Fi association.
pub trait WifiStatusProvider: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Connected SSID with quotes stripped, or `None`/the unknown sentinel.
    fn current_ssid(&self) -> Option<String>;
}

/// The OS "lock the device now" primitive.
///
/// Fire-and-forget and idempotent from the engine's point of view. Returning
/// [`PlatformError::ActuatorUnavailable`] turns the attempt into a logged
/// no-op; the engine never retries.
pub trait LockActuator: Send + Sync {
    fn trigger_lock(&self) -> Result<(), PlatformError>;
}
