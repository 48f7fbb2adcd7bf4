//! Accelerometer sample adapter.
//!
//! The engine only needs the raw instantaneous magnitude of each reading: no
//! gravity compensation, no filtering. A device at rest therefore reports
//! roughly 9.81 m/s², well below the least sensitive threshold.

use serde::{Deserialize, Serialize};

/// One three-axis accelerometer reading, in the unit the sensor reports
/// (m/s² on common platforms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    /// Monotonic timestamp in milliseconds. Informational only.
    #[serde(default)]
    pub timestamp_ms: u64,
    pub accel: [f32; 3],
}

impl AccelSample {
    pub fn new(timestamp_ms: u64, accel: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
        }
    }

    /// Euclidean norm of the acceleration vector.
    pub fn magnitude(&self) -> f64 {
        magnitude(self.accel)
    }
}

pub fn magnitude(accel: [f32; 3]) -> f64 {
    accel
        .iter()
        .map(|&c| f64::from(c) * f64::from(c))
        .sum::<f64>()
        .sqrt()
}
