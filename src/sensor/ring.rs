//! Ring-buffer contract and an in-process implementation.
//!
//! The acquisition side writes raw samples with a monotonically increasing
//! write total. Readers keep their own cursor (the total they have consumed
//! up to) and ask for everything written since.

use crate::sensor::types::{RawSample, Reading};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Default ring capacity (must be a power of 2).
pub const DEFAULT_RING_CAPACITY: usize = 8192;

/// Raw units per g for the default sensor encoding (Q16 fixed point).
pub const DEFAULT_SCALE: f64 = 1.0 / 65536.0;

/// Samples returned by one read, with the cursor to pass next time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RingRead {
    /// Unseen samples in production order
    pub samples: Vec<Reading>,
    /// Write total at the time of the read
    pub cursor: u64,
}

/// Errors a ring source can report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    /// A read failed but the source may recover on the next call.
    Read(String),
    /// The source is gone; no further samples will ever arrive.
    Unavailable(String),
}

impl RingError {
    /// Whether the error should stop the producer.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RingError::Unavailable(_))
    }
}

impl std::fmt::Display for RingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingError::Read(e) => write!(f, "Ring read failed: {e}"),
            RingError::Unavailable(e) => write!(f, "Ring unavailable: {e}"),
        }
    }
}

impl std::error::Error for RingError {}

/// A source of samples addressed by a monotonic cursor.
pub trait SampleRing: Send + Sync {
    /// Return every sample written after `cursor`, scaled by `scale`.
    fn read_new(&self, cursor: u64, scale: f64) -> Result<RingRead, RingError>;
}

struct RingStorage {
    slots: Vec<RawSample>,
    total: u64,
}

/// Fixed-capacity in-process ring shared between a writer thread and readers.
pub struct MemoryRing {
    storage: Mutex<RingStorage>,
    capacity: usize,
    closed: AtomicBool,
}

impl MemoryRing {
    /// Create a ring with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_RING_CAPACITY)
    }

    /// Create a ring holding `capacity` samples.
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Ring buffer capacity must be a power of 2"
        );

        Self {
            storage: Mutex::new(RingStorage {
                slots: vec![RawSample::default(); capacity],
                total: 0,
            }),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one sample, overwriting the oldest once full.
    pub fn push(&self, sample: RawSample) {
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        let index = (storage.total as usize) & (self.capacity - 1);
        storage.slots[index] = sample;
        storage.total += 1;
    }

    /// Total samples ever written.
    pub fn total(&self) -> u64 {
        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total
    }

    /// Mark the ring as gone; readers get [`RingError::Unavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MemoryRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleRing for MemoryRing {
    fn read_new(&self, cursor: u64, scale: f64) -> Result<RingRead, RingError> {
        if self.is_closed() {
            return Err(RingError::Unavailable("ring closed".to_string()));
        }

        let storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        let total = storage.total;
        if cursor >= total {
            return Ok(RingRead {
                samples: Vec::new(),
                cursor: total,
            });
        }

        let mut start = cursor;
        let pending = total - cursor;
        if pending > self.capacity as u64 {
            let lost = pending - self.capacity as u64;
            tracing::warn!(lost, "ring overrun, reader fell behind the writer");
            start = total - self.capacity as u64;
        }

        let samples = (start..total)
            .map(|seq| {
                let raw = storage.slots[(seq as usize) & (self.capacity - 1)];
                Reading::from_raw(raw, scale)
            })
            .collect();

        Ok(RingRead {
            samples,
            cursor: total,
        })
    }
}
