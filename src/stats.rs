//! Pipeline counters.
//!
//! Tracks what the producer consumed and what the hub delivered or dropped,
//! without retaining any sample data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one process lifetime.
#[derive(Debug)]
pub struct PipelineStats {
    /// Producer ticks run
    ticks: AtomicU64,
    /// Ticks that found no new samples
    empty_ticks: AtomicU64,
    /// Ring samples consumed
    samples_consumed: AtomicU64,
    /// Transient ring read failures (treated as empty ticks)
    read_errors: AtomicU64,
    data_events: AtomicU64,
    tap_events: AtomicU64,
    /// Events placed into a subscriber queue
    deliveries: AtomicU64,
    /// Events discarded because a subscriber queue was full
    dropped_deliveries: AtomicU64,
    subscribes: AtomicU64,
    unsubscribes: AtomicU64,
    started_at: DateTime<Utc>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            empty_ticks: AtomicU64::new(0),
            samples_consumed: AtomicU64::new(0),
            read_errors: AtomicU64::new(0),
            data_events: AtomicU64::new(0),
            tap_events: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            dropped_deliveries: AtomicU64::new(0),
            subscribes: AtomicU64::new(0),
            unsubscribes: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_tick(&self, samples: usize) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if samples == 0 {
            self.empty_ticks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.samples_consumed
                .fetch_add(samples as u64, Ordering::Relaxed);
        }
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_data_event(&self) {
        self.data_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tap_event(&self) {
        self.tap_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one fan-out.
    pub fn record_fanout(&self, delivered: usize, dropped: usize) {
        self.deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.dropped_deliveries
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_subscribe(&self) {
        self.subscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsubscribe(&self) {
        self.unsubscribes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            empty_ticks: self.empty_ticks.load(Ordering::Relaxed),
            samples_consumed: self.samples_consumed.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            data_events: self.data_events.load(Ordering::Relaxed),
            tap_events: self.tap_events.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
            subscribes: self.subscribes.load(Ordering::Relaxed),
            unsubscribes: self.unsubscribes.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Ticks: {} ({} empty)\n\
             - Samples consumed: {}\n\
             - Transient read errors: {}\n\
             - Events emitted: {} data, {} tap\n\
             - Deliveries: {} ({} dropped)\n\
             - Subscribers: {} opened, {} closed\n\
             - Uptime: {} seconds",
            stats.ticks,
            stats.empty_ticks,
            stats.samples_consumed,
            stats.read_errors,
            stats.data_events,
            stats.tap_events,
            stats.deliveries,
            stats.dropped_deliveries,
            stats.subscribes,
            stats.unsubscribes,
            stats.uptime_secs
        )
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub empty_ticks: u64,
    pub samples_consumed: u64,
    pub read_errors: u64,
    pub data_events: u64,
    pub tap_events: u64,
    pub deliveries: u64,
    pub dropped_deliveries: u64,
    pub subscribes: u64,
    pub unsubscribes: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedStats = Arc<PipelineStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(PipelineStats::new())
}
