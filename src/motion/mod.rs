// src/motion/mod.rs - Command buffering, move pipeline and interpolation

pub mod interpolator;
pub mod ledger;
pub mod pipeline;
pub mod queue;
pub mod scheduler;

pub use interpolator::{CoordinateMap, DigitalPoint};
pub use ledger::{Point3, PositionLedger};
pub use queue::{CommandQueue, QueueError};
pub use scheduler::{MotionScheduler, SchedulerState, SchedulerStats};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MotionError {
    #[error("Degenerate move: feedrate {feedrate} is not positive")]
    DegenerateMove { feedrate: f64 },
}
