//! Raw and scaled accelerometer readings.

use serde::{Deserialize, Serialize};

/// One raw reading as the acquisition process writes it into the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawSample {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RawSample {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A raw reading converted to g units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Reading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Scale a raw triple into g units.
    pub fn from_raw(raw: RawSample, scale: f64) -> Self {
        Self {
            x: raw.x as f64 * scale,
            y: raw.y as f64 * scale,
            z: raw.z as f64 * scale,
        }
    }

    /// Squared magnitude; only relative jumps matter, so the root is skipped.
    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}
