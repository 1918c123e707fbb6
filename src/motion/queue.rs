// src/motion/queue.rs - Bounded FIFO between the Command Source and the scheduler
use crate::gcode::command::Command;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    /// The rejected command is handed back so the producer can retry it.
    #[error("command queue full, rejected {0}")]
    Full(Command),
}

/// Bounded command FIFO with a fixed capacity. A full queue rejects new
/// commands rather than dropping old ones, and counts each rejection.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
    capacity: usize,
    rejected: u64,
    high_water: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "CommandQueue capacity must be greater than 0");
        Self {
            commands: VecDeque::with_capacity(capacity),
            capacity,
            rejected: 0,
            high_water: 0,
        }
    }

    /// Append at the tail.
    pub fn enqueue(&mut self, cmd: Command) -> Result<(), QueueError> {
        if self.is_full() {
            self.rejected += 1;
            tracing::debug!("Command queue full ({}), rejecting {}", self.capacity, cmd);
            return Err(QueueError::Full(cmd));
        }
        self.commands.push_back(cmd);
        self.high_water = self.high_water.max(self.commands.len());
        Ok(())
    }

    /// Take from the head.
    pub fn dequeue(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Push back onto the head, ahead of everything queued.
    pub fn requeue_front(&mut self, cmd: Command) -> Result<(), QueueError> {
        if self.is_full() {
            self.rejected += 1;
            return Err(QueueError::Full(cmd));
        }
        self.commands.push_front(cmd);
        self.high_water = self.high_water.max(self.commands.len());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.commands.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of commands turned away because the queue was full.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }
}
