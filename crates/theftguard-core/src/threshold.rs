//! Sensitivity → motion threshold mapping.
//!
//! The mapping is a decreasing affine function: the more sensitive the
//! setting, the smaller the acceleration magnitude needed to trigger a lock.
//!
//! ```text
//! level 1.0 -> 80.0   (least sensitive)
//! level 3.0 -> 50.0   (default)
//! level 5.0 -> 20.0   (most sensitive)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_SENSITIVITY: f64 = 1.0;
pub const MAX_SENSITIVITY: f64 = 5.0;
pub const DEFAULT_SENSITIVITY: f64 = 3.0;

const BASE_THRESHOLD: f64 = 80.0;
const STEP_PER_LEVEL: f64 = 15.0;

/// A sensitivity setting in `1.0..=5.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SensitivityLevel(f64);

impl SensitivityLevel {
    pub fn new(level: f64) -> Result<Self, ValidationError> {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&level) {
            return Err(ValidationError::SensitivityOutOfRange(level));
        }
        Ok(Self(level))
    }

    /// Clamp an arbitrary stored value into range. NaN falls back to the default.
    pub fn clamped(level: f64) -> Self {
        if level.is_nan() {
            return Self::default();
        }
        Self(level.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for SensitivityLevel {
    fn default() -> Self {
        Self(DEFAULT_SENSITIVITY)
    }
}

impl TryFrom<f64> for SensitivityLevel {
    type Error = ValidationError;

    fn try_from(level: f64) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<SensitivityLevel> for f64 {
    fn from(level: SensitivityLevel) -> Self {
        level.0
    }
}

/// Acceleration magnitude above which a sample counts as unauthorized motion.
/// Same unit as the sensor reports.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotionThreshold(pub f64);

impl MotionThreshold {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Strict comparison: a sample exactly at the threshold does not qualify.
    pub fn is_exceeded_by(self, magnitude: f64) -> bool {
        magnitude > self.0
    }
}

impl std::fmt::Display for MotionThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

pub fn compute_threshold(level: SensitivityLevel) -> MotionThreshold {
    MotionThreshold(BASE_THRESHOLD - (level.value() - MIN_SENSITIVITY) * STEP_PER_LEVEL)
}
