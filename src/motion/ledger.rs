// src/motion/ledger.rs - Last authoritative position and modal state
use crate::gcode::command::Command;

/// A logical-space coordinate. Z is carried but never actuated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar distance; z does not contribute.
    pub fn distance_xy(&self, other: &Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Position Ledger. An axis or modal value only changes when a command
/// specifies it; unset words carry the previous value forward.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionLedger {
    pub position: Point3,
    pub feedrate: f64,
    pub power: u32,
}

impl PositionLedger {
    /// Seed with the configured origin so every axis always has a value.
    pub fn new(origin: Point3, feedrate: f64) -> Self {
        Self {
            position: origin,
            feedrate,
            power: 0,
        }
    }

    /// Commit the axes a completed move reached.
    pub fn commit_axes(&mut self, cmd: &Command) {
        if let Some(x) = cmd.x {
            self.position.x = x;
        }
        if let Some(y) = cmd.y {
            self.position.y = y;
        }
        if let Some(z) = cmd.z {
            self.position.z = z;
        }
    }

    /// Resolve the full target of `cmd`, falling back per axis to the ledger.
    pub fn resolve_target(&self, cmd: &Command) -> Point3 {
        Point3 {
            x: cmd.x.unwrap_or(self.position.x),
            y: cmd.y.unwrap_or(self.position.y),
            z: cmd.z.unwrap_or(self.position.z),
        }
    }

    /// Pick up feedrate/power from `cmd` when given.
    pub fn apply_modal(&mut self, cmd: &Command) {
        if let Some(feedrate) = cmd.feedrate {
            self.feedrate = feedrate;
        }
        if let Some(power) = cmd.power {
            self.power = power;
        }
    }
}
