//! The producer tick loop.
//!
//! Each tick pulls the new ring samples, runs tap detection over the whole
//! batch and smooths the last sample, then hands the resulting events to the
//! hub. Ticks run on one thread at a fixed cadence and never overlap.

use crate::config::Config;
use crate::core::smoother::Smoother;
use crate::core::tap::TapDetector;
use crate::hub::broadcast::BroadcastHub;
use crate::hub::events::{Event, Sample, TapEvent};
use crate::sensor::consumer::RingConsumer;
use crate::sensor::ring::{RingError, SampleRing};
use crate::stats::SharedStats;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What one tick produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// Samples consumed from the ring
    pub samples: usize,
    pub tap: Option<TapEvent>,
    pub data: Option<Sample>,
}

/// Producer side of the system: ring consumer, filters and the hub.
pub struct Pipeline {
    consumer: RingConsumer,
    smoother: Smoother,
    detector: TapDetector,
    hub: Arc<BroadcastHub>,
    stats: SharedStats,
}

impl Pipeline {
    pub fn new(
        consumer: RingConsumer,
        smoother: Smoother,
        detector: TapDetector,
        hub: Arc<BroadcastHub>,
        stats: SharedStats,
    ) -> Self {
        Self {
            consumer,
            smoother,
            detector,
            hub,
            stats,
        }
    }

    /// Build a pipeline from configuration.
    pub fn from_config(
        config: &Config,
        ring: Arc<dyn SampleRing>,
        hub: Arc<BroadcastHub>,
        stats: SharedStats,
    ) -> Self {
        Self::new(
            RingConsumer::new(ring, config.scale, stats.clone()),
            Smoother::new(config.smoothing_alpha),
            TapDetector::new(config.tap.to_tap_config()),
            hub,
            stats,
        )
    }

    /// Run one tick observed at `now`, stamping smoothed output with `wall_ms`.
    ///
    /// A tick with no new samples broadcasts nothing.
    pub fn tick(&mut self, now: Instant, wall_ms: i64) -> Result<TickOutcome, RingError> {
        let batch = self.consumer.poll()?;
        self.stats.record_tick(batch.len());

        let Some(&latest) = batch.last() else {
            return Ok(TickOutcome::default());
        };

        let tap = self.detector.process(&batch, now);
        if let Some(tap) = tap {
            tracing::debug!(
                count = tap.count,
                class = tap.classification.as_str(),
                "tap window settled"
            );
            self.stats.record_tap_event();
            self.hub.broadcast(Event::Tap(tap));
        }

        let sample = self.smoother.apply(latest, wall_ms);
        self.stats.record_data_event();
        self.hub.broadcast(Event::Data(sample));

        Ok(TickOutcome {
            samples: batch.len(),
            tap,
            data: Some(sample),
        })
    }

    /// Run one tick against the current clocks.
    pub fn tick_now(&mut self) -> Result<TickOutcome, RingError> {
        self.tick(Instant::now(), Utc::now().timestamp_millis())
    }

    /// Tick every `interval` until `running` is cleared.
    ///
    /// Returns an error only when the ring becomes unavailable.
    pub fn run(&mut self, running: &AtomicBool, interval: Duration) -> Result<(), RingError> {
        let ticker = crossbeam_channel::tick(interval);
        tracing::info!(interval_ms = interval.as_millis() as u64, "producer loop started");

        while running.load(Ordering::SeqCst) {
            if ticker.recv().is_err() {
                break;
            }
            if let Err(e) = self.tick_now() {
                tracing::error!(error = %e, "producer loop stopped");
                return Err(e);
            }
        }

        tracing::info!("producer loop stopped");
        Ok(())
    }
}
