//! Linear interpolation and logical-to-digital coordinate mapping.
//!
//! Everything here is pure: the scheduler hands in the ledger position, the
//! resolved target and the elapsed fraction, and gets coordinates back.

use crate::config::ScannerConfig;
use crate::motion::MotionError;
use crate::motion::ledger::Point3;

const NANOS_PER_SECOND: f64 = 1e9;

/// Largest fraction the interpolation branch will use. The deadline branch
/// owns fraction 1.0 so arrival is always the exact target.
pub const MAX_FRACTION: f64 = 1.0 - f64::EPSILON;

/// Point on the straight line from `from` to `to` at `fraction`, which is
/// saturated to `[0, 1)` first. Z is not interpolated.
pub fn interpolate(from: &Point3, to: &Point3, fraction: f64) -> Point3 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, MAX_FRACTION)
    };
    Point3 {
        x: from.x + (to.x - from.x) * fraction,
        y: from.y + (to.y - from.y) * fraction,
        z: to.z,
    }
}

/// Fraction of a move elapsed at `now`.
pub fn elapsed_fraction(start_nanos: u64, now_nanos: u64, duration_nanos: u64) -> f64 {
    if duration_nanos == 0 {
        return MAX_FRACTION;
    }
    now_nanos.saturating_sub(start_nanos) as f64 / duration_nanos as f64
}

/// Duration of a move of `distance` units at `feedrate` units/s.
pub fn move_duration_nanos(distance: f64, feedrate: f64) -> Result<u64, MotionError> {
    if !(feedrate > 0.0) || !feedrate.is_finite() {
        return Err(MotionError::DegenerateMove { feedrate });
    }
    let nanos = distance / feedrate * NANOS_PER_SECOND;
    if !nanos.is_finite() || nanos < 0.0 {
        return Err(MotionError::DegenerateMove { feedrate });
    }
    Ok(nanos.round() as u64)
}

/// A position in the scanner's digital address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalPoint {
    pub x: u16,
    pub y: u16,
}

/// Per-axis linear map from the logical span to `0..=digital_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMap {
    logical_min: f64,
    logical_max: f64,
    digital_max: u16,
    invert_x: bool,
    invert_y: bool,
}

impl CoordinateMap {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            logical_min: config.logical_min,
            logical_max: config.logical_max,
            digital_max: config.digital_max,
            invert_x: config.invert_x,
            invert_y: config.invert_y,
        }
    }

    fn span(&self) -> f64 {
        self.logical_max - self.logical_min
    }

    /// Logical units per digital code.
    pub fn step(&self) -> f64 {
        self.span() / self.digital_max as f64
    }

    fn axis_to_digital(&self, value: f64, invert: bool) -> u16 {
        let max = self.digital_max as f64;
        let scaled = (value - self.logical_min) * max / self.span();
        let scaled = if invert { max - scaled } else { scaled };
        // +0.5 then truncate: round to nearest
        (scaled + 0.5).clamp(0.0, max) as u16
    }

    fn axis_to_logical(&self, code: u16, invert: bool) -> f64 {
        let max = self.digital_max as f64;
        let code = code as f64;
        let code = if invert { max - code } else { code };
        code * self.span() / max + self.logical_min
    }

    pub fn to_digital(&self, point: &Point3) -> DigitalPoint {
        DigitalPoint {
            x: self.axis_to_digital(point.x, self.invert_x),
            y: self.axis_to_digital(point.y, self.invert_y),
        }
    }

    /// Inverse of [`to_digital`](Self::to_digital); z comes back as 0.
    pub fn to_logical(&self, point: DigitalPoint) -> Point3 {
        Point3 {
            x: self.axis_to_logical(point.x, self.invert_x),
            y: self.axis_to_logical(point.y, self.invert_y),
            z: 0.0,
        }
    }
}
