//! Configuration for the accel-stream service.

use crate::core::tap::TapConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind: IpAddr,

    /// Port the HTTP server binds to (0 for random)
    pub port: u16,

    /// Interval between producer ticks
    #[serde(with = "duration_ms")]
    pub tick_interval: Duration,

    /// EMA weight of the newest reading
    pub smoothing_alpha: f64,

    /// Tap detection settings
    pub tap: TapSettings,

    /// Events each subscriber queue can hold before dropping
    pub subscriber_capacity: usize,

    /// Samples held by the in-process ring
    pub ring_capacity: usize,

    /// Raw-to-g conversion factor applied on read
    pub scale: f64,

    /// Directory served for any path the API does not handle
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            tick_interval: Duration::from_millis(20), // ~50 Hz
            smoothing_alpha: crate::core::smoother::DEFAULT_ALPHA,
            tap: TapSettings::default(),
            subscriber_capacity: crate::hub::DEFAULT_SUBSCRIBER_CAPACITY,
            ring_capacity: crate::sensor::DEFAULT_RING_CAPACITY,
            scale: crate::sensor::DEFAULT_SCALE,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accel-stream")
            .join("config.json")
    }

    /// Check that the values can drive a working pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::Invalid("tick_interval must be non-zero".into()));
        }
        if self.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid(
                "subscriber_capacity must be non-zero".into(),
            ));
        }
        if !self.ring_capacity.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "ring_capacity must be a power of 2, got {}",
                self.ring_capacity
            )));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.tap.threshold < 0.0 {
            return Err(ConfigError::Invalid("tap.threshold must not be negative".into()));
        }
        Ok(())
    }
}

/// Tap detection settings as stored in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    /// Squared-magnitude jump (g²) that registers a tap
    pub threshold: f64,
    #[serde(with = "duration_ms")]
    pub cooldown: Duration,
    #[serde(with = "duration_ms")]
    pub window: Duration,
}

impl Default for TapSettings {
    fn default() -> Self {
        let defaults = TapConfig::default();
        Self {
            threshold: defaults.threshold,
            cooldown: defaults.cooldown,
            window: defaults.window,
        }
    }
}

impl TapSettings {
    pub fn to_tap_config(&self) -> TapConfig {
        TapConfig {
            threshold: self.threshold,
            cooldown: self.cooldown,
            window: self.window,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
