//! Sample producers that write into a [`MemoryRing`].
//!
//! Real acquisition happens in a separate process. These feeders stand in for
//! it so the pipeline can run end to end: a synthetic generator and a reader
//! for raw `x y z` lines.

use crate::sensor::ring::MemoryRing;
use crate::sensor::types::RawSample;
use std::f64::consts::TAU;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the synthetic generator.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Samples written per second
    pub rate_hz: u32,
    /// Raw units per g (inverse of the reader's scale)
    pub units_per_g: f64,
    /// Emit impulses so taps can be observed
    pub taps: bool,
    /// Time between impulse groups
    pub tap_period: Duration,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rate_hz: 100,
            units_per_g: 65536.0,
            taps: false,
            tap_period: Duration::from_secs(3),
        }
    }
}

const WOBBLE_G: f64 = 0.02;
const WOBBLE_HZ: f64 = 0.5;
const IMPULSE_G: f64 = 0.3;
// Gap between the two impulses of a double tap: past the cooldown, inside the window.
const DOUBLE_GAP: Duration = Duration::from_millis(250);

/// Compute the `n`th synthetic sample.
///
/// At rest the sensor reads 1 g on z with a slow wobble on x/y. With taps
/// enabled, each period starts with an impulse; every other period adds a
/// second impulse to form a double tap.
pub fn synthetic_sample(n: u64, config: &SyntheticConfig) -> RawSample {
    let rate = config.rate_hz.max(1) as f64;
    let t = n as f64 / rate;

    let x = WOBBLE_G * (TAU * WOBBLE_HZ * t).sin();
    let y = WOBBLE_G * (TAU * WOBBLE_HZ * t).cos();
    let mut z = 1.0;

    if config.taps {
        let period = ((config.tap_period.as_secs_f64() * rate).round() as u64).max(1);
        let gap = (DOUBLE_GAP.as_secs_f64() * rate).round() as u64;
        let cycle = n / period;
        let offset = n % period;
        if offset == 0 || (cycle % 2 == 1 && offset == gap) {
            z += IMPULSE_G;
        }
    }

    RawSample::new(
        (x * config.units_per_g).round() as i32,
        (y * config.units_per_g).round() as i32,
        (z * config.units_per_g).round() as i32,
    )
}

/// Writes synthetic samples into a ring from a background thread.
pub struct SyntheticFeeder {
    config: SyntheticConfig,
    ring: Arc<MemoryRing>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl SyntheticFeeder {
    pub fn new(config: SyntheticConfig, ring: Arc<MemoryRing>) -> Self {
        Self {
            config,
            ring,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }
    }

    /// Start writing samples. Does nothing if already running.
    pub fn start(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let ring = self.ring.clone();
        let running = self.running.clone();
        let config = self.config.clone();
        let interval = Duration::from_secs_f64(1.0 / config.rate_hz.max(1) as f64);

        let handle = thread::spawn(move || {
            let mut n = 0u64;
            while running.load(Ordering::SeqCst) {
                ring.push(synthetic_sample(n, &config));
                n += 1;
                thread::sleep(interval);
            }
        });

        tracing::info!(
            rate_hz = self.config.rate_hz,
            taps = self.config.taps,
            "synthetic feeder started"
        );
        self.thread_handle = Some(handle);
    }

    /// Stop writing samples and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for SyntheticFeeder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parse one `x y z` line of raw integers.
pub fn parse_line(line: &str) -> Option<RawSample> {
    let mut parts = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RawSample::new(x, y, z))
}

/// Spawn a thread that copies raw lines from `reader` into the ring.
///
/// Blank lines and `#` comments are ignored; malformed lines are skipped
/// with a warning. The thread ends at EOF and returns the number of samples
/// written. The ring stays open.
pub fn spawn_line_feeder<R>(reader: R, ring: Arc<MemoryRing>) -> JoinHandle<u64>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        let mut written = 0u64;
        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "line input failed");
                    break;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_line(trimmed) {
                Some(sample) => {
                    ring.push(sample);
                    written += 1;
                }
                None => tracing::warn!(line = index + 1, "skipping malformed sample line"),
            }
        }
        tracing::info!(written, "line input finished");
        written
    })
}
