pub mod time_interface;

pub use time_interface::{ManualClock, MonotonicClock, TimeSource};
