//! Cursor-tracking reader over a [`SampleRing`].

use crate::sensor::ring::{RingError, SampleRing};
use crate::sensor::types::Reading;
use crate::stats::SharedStats;
use std::sync::Arc;

/// Pulls the samples produced since the previous poll.
///
/// The cursor lives here and nowhere else; it is read once per poll and only
/// ever moves forward.
pub struct RingConsumer {
    ring: Arc<dyn SampleRing>,
    cursor: u64,
    scale: f64,
    stats: SharedStats,
}

impl RingConsumer {
    pub fn new(ring: Arc<dyn SampleRing>, scale: f64, stats: SharedStats) -> Self {
        Self {
            ring,
            cursor: 0,
            scale,
            stats,
        }
    }

    /// Start reading at `cursor` instead of the beginning of the ring.
    pub fn starting_at(mut self, cursor: u64) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Read everything written since the last poll.
    ///
    /// Transient read failures are reported as an empty batch. Only an
    /// unavailable ring is returned as an error.
    pub fn poll(&mut self) -> Result<Vec<Reading>, RingError> {
        match self.ring.read_new(self.cursor, self.scale) {
            Ok(read) => {
                // Never rewind, even if a source hands back a smaller total.
                self.cursor = self.cursor.max(read.cursor);
                Ok(read.samples)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.stats.record_read_error();
                tracing::debug!(error = %e, cursor = self.cursor, "transient ring read error");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::ring::{MemoryRing, RingRead};
    use crate::sensor::types::RawSample;
    use crate::stats::create_shared_stats;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_poll_consumes_each_sample_once() {
        let ring = Arc::new(MemoryRing::with_capacity(64));
        let mut consumer = RingConsumer::new(ring.clone(), 1.0, create_shared_stats());

        assert!(consumer.poll().unwrap().is_empty());

        ring.push(RawSample::new(1, 0, 0));
        ring.push(RawSample::new(2, 0, 0));
        let batch = consumer.poll().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(consumer.cursor(), 2);

        assert!(consumer.poll().unwrap().is_empty());

        ring.push(RawSample::new(3, 0, 0));
        let batch = consumer.poll().unwrap();
        assert_eq!(batch, vec![Reading::new(3.0, 0.0, 0.0)]);
        assert_eq!(consumer.cursor(), 3);
    }

    #[test]
    fn test_starting_cursor_skips_history() {
        let ring = Arc::new(MemoryRing::with_capacity(16));
        ring.push(RawSample::new(1, 0, 0));
        ring.push(RawSample::new(2, 0, 0));

        let mut consumer =
            RingConsumer::new(ring.clone(), 1.0, create_shared_stats()).starting_at(ring.total());
        assert!(consumer.poll().unwrap().is_empty());
    }

    struct FlakyRing {
        calls: AtomicUsize,
    }

    impl SampleRing for FlakyRing {
        fn read_new(&self, cursor: u64, _scale: f64) -> Result<RingRead, RingError> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(RingError::Read("busy".to_string())),
                1 => Ok(RingRead {
                    samples: vec![Reading::new(0.0, 0.0, 1.0)],
                    cursor: cursor + 1,
                }),
                // A misbehaving source reporting an older total.
                2 => Ok(RingRead {
                    samples: Vec::new(),
                    cursor: 0,
                }),
                _ => Err(RingError::Unavailable("gone".to_string())),
            }
        }
    }

    #[test]
    fn test_transient_error_is_empty_batch_and_fatal_propagates() {
        let stats = create_shared_stats();
        let ring = Arc::new(FlakyRing {
            calls: AtomicUsize::new(0),
        });
        let mut consumer = RingConsumer::new(ring, 1.0, stats.clone());

        assert!(consumer.poll().unwrap().is_empty());
        assert_eq!(stats.stats().read_errors, 1);

        assert_eq!(consumer.poll().unwrap().len(), 1);
        assert_eq!(consumer.cursor(), 1);

        assert!(consumer.poll().unwrap().is_empty());
        assert_eq!(consumer.cursor(), 1);

        assert!(consumer.poll().unwrap_err().is_fatal());
    }
}
