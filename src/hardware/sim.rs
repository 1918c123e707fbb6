// src/hardware/sim.rs - Simulated collaborators for running without hardware
use crate::gcode::command::Command;
use crate::hardware::{LaserDriver, ModifierHandler, ScannerDriver};

/// Scanner that remembers where it was sent.
#[derive(Debug, Clone, Default)]
pub struct SimScanner {
    pub position: Option<(u16, u16)>,
    pub moves: u64,
}

impl ScannerDriver for SimScanner {
    fn move_to(&mut self, x: u16, y: u16) {
        tracing::trace!("galvo -> ({}, {})", x, y);
        self.position = Some((x, y));
        self.moves += 1;
    }
}

/// Laser that tracks its armed level and pacing calls.
#[derive(Debug, Clone, Default)]
pub struct SimLaser {
    pub power: u32,
    pub arm_count: u64,
    pub ticks: u64,
}

impl LaserDriver for SimLaser {
    fn set_power(&mut self, level: u32) {
        if level != self.power {
            tracing::debug!("laser power {} -> {}", self.power, level);
        }
        self.power = level;
        self.arm_count += 1;
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }
}

/// Modifier sink that logs each command it receives.
#[derive(Debug, Clone, Default)]
pub struct LoggingModifierHandler {
    pub executed: u64,
}

impl ModifierHandler for LoggingModifierHandler {
    fn execute(&mut self, command: &Command) {
        self.executed += 1;
        tracing::info!("Executing modifier {}", command);
    }
}
