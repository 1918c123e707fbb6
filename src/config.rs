//! # Controller Configuration
//!
//! Scanner calibration, laser range and scheduler tuning, loaded from TOML.
//!
//! ## Example
//!
//! ```toml
//! [scanner]
//! logical_min = 0.0
//! logical_max = 250.0
//! digital_max = 65535
//! invert_x = true
//! invert_y = false
//!
//! [laser]
//! max_power = 255
//!
//! [motion]
//! queue_capacity = 64
//! default_feedrate = 100.0
//! min_tick_rate_hz = 10000.0
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

// src/config.rs - Single configuration file
use crate::motion::ledger::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub laser: LaserConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

/// Scanner calibration: logical span, digital resolution and handedness.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default = "default_logical_min")]
    pub logical_min: f64,
    #[serde(default = "default_logical_max")]
    pub logical_max: f64,
    #[serde(default = "default_digital_max")]
    pub digital_max: u16,
    #[serde(default = "default_invert_x")]
    pub invert_x: bool,
    #[serde(default)]
    pub invert_y: bool,
    #[serde(default)]
    pub origin_x: f64,
    #[serde(default)]
    pub origin_y: f64,
    #[serde(default)]
    pub origin_z: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            logical_min: default_logical_min(),
            logical_max: default_logical_max(),
            digital_max: default_digital_max(),
            invert_x: default_invert_x(),
            invert_y: false,
            origin_x: 0.0,
            origin_y: 0.0,
            origin_z: 0.0,
        }
    }
}

impl ScannerConfig {
    pub fn origin(&self) -> Point3 {
        Point3::new(self.origin_x, self.origin_y, self.origin_z)
    }
}

/// Emission channel range.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LaserConfig {
    #[serde(default = "default_max_power")]
    pub max_power: u32,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            max_power: default_max_power(),
        }
    }
}

/// Scheduler tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MotionConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Used until the first command sets a feedrate (units/s).
    #[serde(default = "default_feedrate")]
    pub default_feedrate: f64,
    /// Slowest tick rate the loop is expected to sustain.
    #[serde(default = "default_min_tick_rate_hz")]
    pub min_tick_rate_hz: f64,
    /// Reverse consecutive modifiers the way the old firmware did.
    #[serde(default)]
    pub legacy_modifier_order: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            default_feedrate: default_feedrate(),
            min_tick_rate_hz: default_min_tick_rate_hz(),
            legacy_modifier_order: false,
        }
    }
}

impl MotionConfig {
    /// Longest acceptable gap between two ticks.
    pub fn max_tick_interval_nanos(&self) -> u64 {
        (1e9 / self.min_tick_rate_hz) as u64
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scanner = &self.scanner;
        if !(scanner.logical_max > scanner.logical_min) {
            return Err(ConfigError::Invalid(format!(
                "logical span {}..{} is empty",
                scanner.logical_min, scanner.logical_max
            )));
        }
        if scanner.digital_max == 0 {
            return Err(ConfigError::Invalid("digital_max must be > 0".to_string()));
        }
        let origin = scanner.origin();
        for (axis, value) in [("x", origin.x), ("y", origin.y)] {
            if value < scanner.logical_min || value > scanner.logical_max {
                return Err(ConfigError::Invalid(format!(
                    "origin {} = {} lies outside the logical span",
                    axis, value
                )));
            }
        }
        if self.motion.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be > 0".to_string()));
        }
        if !(self.motion.default_feedrate > 0.0) {
            return Err(ConfigError::Invalid("default_feedrate must be > 0".to_string()));
        }
        if !(self.motion.min_tick_rate_hz > 0.0) {
            return Err(ConfigError::Invalid("min_tick_rate_hz must be > 0".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_logical_min() -> f64 { 0.0 }
fn default_logical_max() -> f64 { 250.0 }
fn default_digital_max() -> u16 { 65535 }
fn default_invert_x() -> bool { true }
fn default_max_power() -> u32 { 255 }
fn default_queue_capacity() -> usize { 64 }
fn default_feedrate() -> f64 { 100.0 }
fn default_min_tick_rate_hz() -> f64 { 10_000.0 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}
