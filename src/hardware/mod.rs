// src/hardware/mod.rs - Collaborator ports driven by the scheduler
//
// The scheduler only pushes into these sinks and never reads back their
// state. Every call happens inside a tick, so implementations must return
// promptly and must not block.
pub mod sim;

use crate::gcode::command::Command;

pub use sim::{LoggingModifierHandler, SimLaser, SimScanner};

/// Galvanometer scanner addressed in digital coordinates.
pub trait ScannerDriver {
    fn move_to(&mut self, x: u16, y: u16);
}

/// Modulated emission channel.
pub trait LaserDriver {
    /// Arm the level for the move about to start.
    fn set_power(&mut self, level: u32);
    /// Pacing hook, called on every evaluation of an active move.
    fn tick(&mut self);
}

/// Executes non-motion commands between moves.
pub trait ModifierHandler {
    fn execute(&mut self, command: &Command);
}

impl<T: ScannerDriver + ?Sized> ScannerDriver for &mut T {
    fn move_to(&mut self, x: u16, y: u16) {
        (**self).move_to(x, y)
    }
}

impl<T: LaserDriver + ?Sized> LaserDriver for &mut T {
    fn set_power(&mut self, level: u32) {
        (**self).set_power(level)
    }

    fn tick(&mut self) {
        (**self).tick()
    }
}

impl<T: ModifierHandler + ?Sized> ModifierHandler for &mut T {
    fn execute(&mut self, command: &Command) {
        (**self).execute(command)
    }
}
