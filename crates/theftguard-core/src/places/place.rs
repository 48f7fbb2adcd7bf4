use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::trust::normalize_ssid;

/// WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(ValidationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Which tab a place is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Location,
    Wifi,
}

impl std::str::FromStr for PlaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "location" => Ok(PlaceKind::Location),
            "wifi" => Ok(PlaceKind::Wifi),
            other => Err(format!("unknown place kind: {other}")),
        }
    }
}

/// A context in which motion should not trigger a lock.
///
/// Persisted as a record with a `type` discriminant, a `label`, and either a
/// `point` or an `ssid`:
///
/// ```toml
/// [[trusted_places]]
/// type = "location"
/// label = "Home"
/// point = { latitude = 52.52, longitude = 13.405 }
///
/// [[trusted_places]]
/// type = "wifi"
/// label = "HomeNet"
/// ssid = "HomeNet"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrustedPlace {
    Location { label: String, point: GeoPoint },
    Wifi { label: String, ssid: String },
}

impl TrustedPlace {
    pub fn location(label: impl Into<String>, point: GeoPoint) -> Result<Self, ValidationError> {
        let label = checked_label(label.into())?;
        Ok(TrustedPlace::Location { label, point })
    }

    /// Build a Wi-Fi entry from the SSID as the platform reports it.
    /// The label is the SSID itself.
    pub fn wifi(raw_ssid: &str) -> Result<Self, ValidationError> {
        let ssid = normalize_ssid(raw_ssid).ok_or(ValidationError::UnusableSsid)?;
        Ok(TrustedPlace::Wifi {
            label: ssid.clone(),
            ssid,
        })
    }

    pub fn label(&self) -> &str {
        match self {
            TrustedPlace::Location { label, .. } | TrustedPlace::Wifi { label, .. } => label,
        }
    }

    pub fn kind(&self) -> PlaceKind {
        match self {
            TrustedPlace::Location { .. } => PlaceKind::Location,
            TrustedPlace::Wifi { .. } => PlaceKind::Wifi,
        }
    }

    /// Same place, new label. The payload is untouched.
    pub fn relabeled(&self, label: impl Into<String>) -> Result<Self, ValidationError> {
        let label = checked_label(label.into())?;
        Ok(match self {
            TrustedPlace::Location { point, .. } => TrustedPlace::Location {
                label,
                point: *point,
            },
            TrustedPlace::Wifi { ssid, .. } => TrustedPlace::Wifi {
                label,
                ssid: ssid.clone(),
            },
        })
    }

    /// Re-check the constructor invariants on a place that was deserialized
    /// rather than built through [`TrustedPlace::location`] or
    /// [`TrustedPlace::wifi`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        checked_label(self.label().to_string())?;
        match self {
            TrustedPlace::Location { point, .. } => {
                GeoPoint::new(point.latitude, point.longitude)?;
            }
            TrustedPlace::Wifi { ssid, .. } => {
                if normalize_ssid(ssid).as_deref() != Some(ssid.as_str()) {
                    return Err(ValidationError::UnusableSsid);
                }
            }
        }
        Ok(())
    }
}

fn checked_label(label: String) -> Result<String, ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    Ok(label)
}
