//! accel-stream - live accelerometer motion and tap gestures over HTTP.
//!
//! This library consumes 3-axis samples from a ring buffer written by an
//! acquisition process, derives a smoothed motion signal and discrete tap
//! gestures, and fans both out to any number of live subscribers.
//!
//! # Guarantees
//!
//! - **At-most-once consumption**: every ring sample is read by exactly one tick
//! - **Bounded memory**: each subscriber queue holds a fixed number of events
//! - **Non-blocking fan-out**: a slow subscriber only loses its own events
//! - **Ordered delivery**: each subscriber sees events in emission order
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         accel-stream                          │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │    Ring     │──▶│ RingConsumer │──▶│ TapDetector  │──┐     │
//! │  │  (feeder)   │   │  (20ms tick) │   ├──────────────┤  │     │
//! │  └─────────────┘   └──────────────┘   │   Smoother   │──┤     │
//! │                                       └──────────────┘  ▼     │
//! │                    ┌──────────────┐   ┌──────────────────┐    │
//! │                    │ GET /events  │◀──│   BroadcastHub   │    │
//! │                    │ GET /latest  │◀──│ (64-event queues)│    │
//! │                    └──────────────┘   └──────────────────┘    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use accel_stream::{core::Pipeline, hub::BroadcastHub, sensor::MemoryRing, stats, Config};
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let stats = stats::create_shared_stats();
//! let ring = Arc::new(MemoryRing::with_capacity(config.ring_capacity));
//! let hub = Arc::new(BroadcastHub::new(config.subscriber_capacity, stats.clone()));
//!
//! let _subscriber = hub.subscribe();
//! let mut pipeline = Pipeline::from_config(&config, ring, hub.clone(), stats);
//!
//! let running = AtomicBool::new(true);
//! pipeline.run(&running, config.tick_interval).expect("ring closed");
//! ```

pub mod config;
pub mod core;
pub mod hub;
pub mod sensor;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use crate::config::{Config, ConfigError, TapSettings};
pub use crate::core::{Pipeline, Smoother, TapConfig, TapDetector};
pub use crate::hub::{BroadcastHub, Event, Sample, Subscriber, TapClass, TapEvent};
pub use crate::sensor::{MemoryRing, RingConsumer, RingError, SampleRing};
pub use crate::stats::{PipelineStats, SharedStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
