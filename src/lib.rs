// galvo-rs: motion/laser synchronization core for a two-axis galvo scanner

pub mod config;
pub mod gcode;
pub mod hardware;
pub mod motion;
pub mod scheduler;

pub use config::{Config, ConfigError};
pub use gcode::{Command, CommandKind};
pub use hardware::{LaserDriver, ModifierHandler, ScannerDriver};
pub use motion::{MotionScheduler, SchedulerState};
