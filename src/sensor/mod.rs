//! Sample acquisition side of the pipeline.
//!
//! The ring buffer is the only contact point with the acquisition process:
//! feeders write raw samples into it, and the [`RingConsumer`] reads back
//! whatever is new on each producer tick.

pub mod consumer;
pub mod feeder;
pub mod ring;
pub mod types;

// Re-export commonly used types
pub use consumer::RingConsumer;
pub use feeder::{spawn_line_feeder, SyntheticConfig, SyntheticFeeder};
pub use ring::{MemoryRing, RingError, RingRead, SampleRing, DEFAULT_RING_CAPACITY, DEFAULT_SCALE};
pub use types::{RawSample, Reading};
