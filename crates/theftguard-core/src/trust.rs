//! Trust evaluation: is the device currently inside a trusted zone?
//!
//! A device is trusted when it is within [`TRUSTED_RADIUS_METERS`] of any
//! trusted location, or connected to any trusted Wi-Fi network. Missing data
//! never produces trust: with no location fix and no usable SSID the device
//! is untrusted and protection stays active.

use serde::{Deserialize, Serialize};

use crate::places::{GeoPoint, TrustedPlaceSet};

pub const TRUSTED_RADIUS_METERS: f64 = 50.0;

/// SSID the platform reports when it cannot see the connected network.
pub const UNKNOWN_SSID: &str = "<unknown ssid>";

/// Mean Earth radius (IUGG), meters.
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Last known radio state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WifiState {
    pub enabled: bool,
    /// Normalized SSID; `None` when unknown or not connected.
    pub ssid: Option<String>,
}

impl WifiState {
    pub fn new(ssid: Option<&str>, enabled: bool) -> Self {
        Self {
            enabled,
            ssid: ssid.and_then(normalize_ssid),
        }
    }
}

/// Everything trust is computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationContext {
    pub location: Option<GeoPoint>,
    pub wifi: WifiState,
    pub places: TrustedPlaceSet,
}

impl EvaluationContext {
    pub fn new(places: TrustedPlaceSet) -> Self {
        Self {
            places,
            ..Self::default()
        }
    }
}

/// Strip surrounding quotes and reject values that cannot name a network.
pub fn normalize_ssid(raw: &str) -> Option<String> {
    let ssid = raw.replace('"', "");
    if ssid.trim().is_empty() || ssid == UNKNOWN_SSID {
        return None;
    }
    Some(ssid)
}

/// Great-circle (haversine) distance in meters.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

pub fn within_trusted_radius(distance: f64) -> bool {
    distance < TRUSTED_RADIUS_METERS
}

pub fn is_location_trusted(fix: Option<&GeoPoint>, places: &TrustedPlaceSet) -> bool {
    let Some(fix) = fix else {
        return false;
    };
    places
        .location_points()
        .any(|point| within_trusted_radius(distance_meters(fix, point)))
}

pub fn is_wifi_trusted(wifi: &WifiState, places: &TrustedPlaceSet) -> bool {
    if !wifi.enabled {
        return false;
    }
    let Some(current) = wifi.ssid.as_deref() else {
        return false;
    };
    if current == UNKNOWN_SSID {
        return false;
    }
    places.wifi_ssids().any(|ssid| ssid == current)
}

pub fn is_trusted(context: &EvaluationContext) -> bool {
    let by_location = is_location_trusted(context.location.as_ref(), &context.places);
    let by_wifi = is_wifi_trusted(&context.wifi, &context.places);
    by_location || by_wifi
}
