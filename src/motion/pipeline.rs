// src/motion/pipeline.rs - Three rolling in-flight move slots
use crate::gcode::command::Command;

const SLOTS: usize = 3;

/// Fixed ring of previous/current/next slots addressed by index. Advancing
/// rotates the ring; the slot that was `previous` is retired and reused for
/// the incoming `next`.
#[derive(Debug, Clone, Default)]
pub struct MovePipeline {
    slots: [Option<Command>; SLOTS],
    head: usize,
}

impl MovePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % SLOTS
    }

    /// previous <- current, current <- next, next <- empty. Returns the
    /// retired command, if any.
    pub fn advance(&mut self) -> Option<Command> {
        let retired = self.slots[self.head].take();
        self.head = self.index(1);
        retired
    }

    pub fn set_next(&mut self, cmd: Option<Command>) {
        let idx = self.index(2);
        self.slots[idx] = cmd;
    }

    pub fn previous(&self) -> Option<&Command> {
        self.slots[self.index(0)].as_ref()
    }

    pub fn current(&self) -> Option<&Command> {
        self.slots[self.index(1)].as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Command> {
        let idx = self.index(1);
        self.slots[idx].as_mut()
    }

    pub fn next(&self) -> Option<&Command> {
        self.slots[self.index(2)].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// True when nothing is current or waiting; a retained previous move
    /// does not count as in flight.
    pub fn is_drained(&self) -> bool {
        self.current().is_none() && self.next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_shift_on_advance() {
        let mut pipeline = MovePipeline::new();
        pipeline.advance();
        pipeline.set_next(Some(Command::motion(1).with_x(1.0)));
        assert!(pipeline.current().is_none());
        assert_eq!(pipeline.next().unwrap().x, Some(1.0));

        pipeline.advance();
        pipeline.set_next(Some(Command::motion(1).with_x(2.0)));
        assert_eq!(pipeline.current().unwrap().x, Some(1.0));
        assert_eq!(pipeline.next().unwrap().x, Some(2.0));
        assert!(pipeline.previous().is_none());

        pipeline.advance();
        pipeline.set_next(None);
        assert_eq!(pipeline.previous().unwrap().x, Some(1.0));
        assert_eq!(pipeline.current().unwrap().x, Some(2.0));
        assert!(pipeline.next().is_none());
    }

    #[test]
    fn test_previous_retired_one_advance_after_leaving() {
        let mut pipeline = MovePipeline::new();
        pipeline.set_next(Some(Command::motion(1).with_x(1.0)));
        pipeline.advance(); // current = 1
        pipeline.advance(); // previous = 1
        assert!(pipeline.is_drained());
        assert_eq!(pipeline.previous().unwrap().x, Some(1.0));
        let retired = pipeline.advance();
        assert_eq!(retired.unwrap().x, Some(1.0));
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_current_mut_updates_slot() {
        let mut pipeline = MovePipeline::new();
        pipeline.set_next(Some(Command::motion(1)));
        pipeline.advance();
        pipeline.current_mut().unwrap().duration_nanos = 42;
        assert_eq!(pipeline.current().unwrap().duration_nanos, 42);
        assert!(!pipeline.is_drained());
    }
}
