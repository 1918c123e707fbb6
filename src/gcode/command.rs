// src/gcode/command.rs - Structured command produced by the Command Source
use std::fmt;

/// Whether a command moves the mirror or only has a side effect between moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Motion,
    Modifier,
}

/// One parsed instruction. Unset words stay `None`; a coordinate of any
/// value, including extreme ones, is always a real target.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    /// Command letter as written: `G` for motion, `M`, `T`, ... for modifiers.
    pub prefix: char,
    pub code: u32,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub feedrate: Option<f64>,
    pub power: Option<u32>,
    /// Filled in by the scheduler when the move is armed.
    pub duration_nanos: u64,
}

impl Command {
    pub fn motion(code: u32) -> Self {
        Self::from_word('G', code)
    }

    pub fn modifier(code: u32) -> Self {
        Self::from_word('M', code)
    }

    /// `G` is motion; any other letter is a modifier.
    pub fn from_word(prefix: char, code: u32) -> Self {
        let prefix = prefix.to_ascii_uppercase();
        let kind = if prefix == 'G' {
            CommandKind::Motion
        } else {
            CommandKind::Modifier
        };
        Self {
            kind,
            prefix,
            code,
            x: None,
            y: None,
            z: None,
            feedrate: None,
            power: None,
            duration_nanos: 0,
        }
    }

    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_feedrate(mut self, feedrate: f64) -> Self {
        self.feedrate = Some(feedrate);
        self
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = Some(power);
        self
    }

    pub fn is_motion(&self) -> bool {
        self.kind == CommandKind::Motion
    }

    /// Code 0 motion: jump without pacing, emission off.
    pub fn is_rapid(&self) -> bool {
        self.is_motion() && self.code == 0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.code)?;
        if let Some(x) = self.x {
            write!(f, " X{}", x)?;
        }
        if let Some(y) = self.y {
            write!(f, " Y{}", y)?;
        }
        if let Some(z) = self.z {
            write!(f, " Z{}", z)?;
        }
        if let Some(feedrate) = self.feedrate {
            write!(f, " F{}", feedrate)?;
        }
        if let Some(power) = self.power {
            write!(f, " S{}", power)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_leaves_unset_fields_empty() {
        let cmd = Command::motion(1).with_x(10.0).with_feedrate(5.0);
        assert_eq!(cmd.x, Some(10.0));
        assert_eq!(cmd.y, None);
        assert_eq!(cmd.z, None);
        assert_eq!(cmd.power, None);
        assert_eq!(cmd.duration_nanos, 0);
    }

    #[test]
    fn test_extreme_coordinate_is_not_unset() {
        // A value that an in-band "unset" marker would have swallowed.
        let cmd = Command::motion(1).with_x(f64::MAX);
        assert_eq!(cmd.x, Some(f64::MAX));
    }

    #[test]
    fn test_rapid_only_for_motion_code_zero() {
        assert!(Command::motion(0).is_rapid());
        assert!(!Command::motion(1).is_rapid());
        assert!(!Command::modifier(0).is_rapid());
    }

    #[test]
    fn test_display() {
        let cmd = Command::motion(1).with_x(1.5).with_y(2.0).with_power(40);
        assert_eq!(cmd.to_string(), "G1 X1.5 Y2 S40");
        assert_eq!(Command::modifier(3).to_string(), "M3");
        assert_eq!(Command::from_word('t', 5).to_string(), "T5");
    }

    #[test]
    fn test_non_g_letters_are_modifiers() {
        let tool = Command::from_word('T', 5);
        assert_eq!(tool.kind, CommandKind::Modifier);
        assert_ne!(tool, Command::modifier(5));
        assert!(Command::from_word('g', 1).is_motion());
    }
}
