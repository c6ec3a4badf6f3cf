//! Tap gesture detection.
//!
//! A tap is a jump in squared magnitude between consecutive samples. Taps
//! closer together than the cooldown are treated as ringing from the same
//! physical tap. Taps are grouped into a window that settles once no tap has
//! been seen for the window duration; each settled window yields exactly one
//! [`TapEvent`].
//!
//! Settling is only checked when a batch arrives, so emission lags the
//! window by at most one producer tick. If ticks stop entirely (producer
//! shutdown) a pending window is never flushed.
//!
//! The previous magnitude starts unset rather than at zero: the first
//! reading only seeds it, so a sensor at rest (about 1 g²) does not register
//! a tap at startup.

use crate::hub::events::TapEvent;
use crate::sensor::types::Reading;
use std::time::{Duration, Instant};

/// Thresholds and timings for tap detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapConfig {
    /// Minimum squared-magnitude change (g²) that counts as a tap
    pub threshold: f64,
    /// Minimum time between two registered taps
    pub cooldown: Duration,
    /// Quiet time after the last tap before the window settles
    pub window: Duration,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            cooldown: Duration::from_millis(150),
            window: Duration::from_millis(400),
        }
    }
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapState {
    Idle,
    WindowOpen,
}

/// Tap detector state machine.
#[derive(Debug, Clone)]
pub struct TapDetector {
    config: TapConfig,
    state: TapState,
    /// None until the first sample seeds the baseline
    last_magnitude: Option<f64>,
    last_tap_time: Option<Instant>,
    tap_count: u32,
}

impl TapDetector {
    pub fn new(config: TapConfig) -> Self {
        Self {
            config,
            state: TapState::Idle,
            last_magnitude: None,
            last_tap_time: None,
            tap_count: 0,
        }
    }

    pub fn state(&self) -> TapState {
        self.state
    }

    /// Taps registered in the currently open window.
    pub fn pending_taps(&self) -> u32 {
        self.tap_count
    }

    /// Process one tick's batch, observed at `now`.
    ///
    /// Returns the tap event if the open window settled during this tick.
    pub fn process(&mut self, batch: &[Reading], now: Instant) -> Option<TapEvent> {
        for reading in batch {
            self.observe(reading.magnitude_squared(), now);
        }
        self.settle(now)
    }

    fn observe(&mut self, magnitude: f64, now: Instant) {
        // The very first sample only seeds the baseline.
        let Some(last) = self.last_magnitude.replace(magnitude) else {
            return;
        };

        let diff = (magnitude - last).abs();
        if diff > self.config.threshold && self.cooldown_elapsed(now) {
            self.tap_count += 1;
            self.last_tap_time = Some(now);
            self.state = TapState::WindowOpen;
        }
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_tap_time {
            Some(at) => now.saturating_duration_since(at) > self.config.cooldown,
            None => true,
        }
    }

    fn settle(&mut self, now: Instant) -> Option<TapEvent> {
        if self.state != TapState::WindowOpen {
            return None;
        }
        let last_tap = self.last_tap_time?;
        if now.saturating_duration_since(last_tap) <= self.config.window {
            return None;
        }

        let event = TapEvent::new(self.tap_count);
        self.tap_count = 0;
        self.state = TapState::Idle;
        Some(event)
    }
}

impl Default for TapDetector {
    fn default() -> Self {
        Self::new(TapConfig::default())
    }
}
