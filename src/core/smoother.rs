//! Per-axis exponential moving average.

use crate::hub::events::Sample;
use crate::sensor::types::Reading;

/// Default weight of the newest reading.
pub const DEFAULT_ALPHA: f64 = 0.15;

/// Smooths the last reading of each tick.
///
/// `smoothed = alpha * current + (1 - alpha) * previous`, seeded with the
/// first reading unchanged so there is no ramp-in from zero.
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f64,
    state: Option<[f64; 3]>,
}

impl Smoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    /// Fold in `reading` and return the smoothed sample stamped with `t`.
    pub fn apply(&mut self, reading: Reading, t: i64) -> Sample {
        let current = [reading.x, reading.y, reading.z];
        let next = match self.state {
            None => current,
            Some(prev) => {
                let a = self.alpha;
                [
                    a * current[0] + (1.0 - a) * prev[0],
                    a * current[1] + (1.0 - a) * prev[1],
                    a * current[2] + (1.0 - a) * prev[2],
                ]
            }
        };
        self.state = Some(next);
        Sample::new(next[0], next[1], next[2], t)
    }

    /// Forget the current average; the next reading seeds it again.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
