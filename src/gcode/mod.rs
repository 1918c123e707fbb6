// src/gcode/mod.rs
pub mod command;
pub mod parser;

pub use command::{Command, CommandKind};
pub use parser::{parse_line, GCodeReader, ParseError};
