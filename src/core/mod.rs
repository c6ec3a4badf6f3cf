//! Signal processing for the accel-stream service.
//!
//! This module contains:
//! - Exponential smoothing of the motion signal
//! - The tap gesture state machine
//! - The producer tick loop that feeds both into the broadcast hub

pub mod pipeline;
pub mod smoother;
pub mod tap;

// Re-export commonly used types
pub use pipeline::{Pipeline, TickOutcome};
pub use smoother::{Smoother, DEFAULT_ALPHA};
pub use tap::{TapConfig, TapDetector, TapState};
