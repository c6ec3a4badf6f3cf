//! Event types carried from the producer to every subscriber.
//!
//! These are plain values: once built they are never mutated, and the hub
//! clones them into each subscriber queue.

use serde::{Deserialize, Serialize};

/// A smoothed motion reading as published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Wall-clock emission time, unix milliseconds
    pub t: i64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, t: i64) -> Self {
        Self { x, y, z, t }
    }
}

/// How a settled tap window was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TapClass {
    Single,
    Double,
}

impl TapClass {
    /// Classify a window by the number of taps it grouped.
    pub fn from_count(count: u32) -> Self {
        if count >= 2 {
            TapClass::Double
        } else {
            TapClass::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TapClass::Single => "single",
            TapClass::Double => "double",
        }
    }
}

/// One tap gesture, emitted once per settled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Number of taps grouped into the window (always >= 1)
    pub count: u32,
    pub classification: TapClass,
}

impl TapEvent {
    pub fn new(count: u32) -> Self {
        Self {
            count,
            classification: TapClass::from_count(count),
        }
    }
}

/// Everything the hub fans out.
///
/// Serialized as `{"type": "data" | "tap", "data": <payload>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Event {
    Data(Sample),
    Tap(TapEvent),
}

impl Event {
    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Data(_) => "data",
            Event::Tap(_) => "tap",
        }
    }
}
