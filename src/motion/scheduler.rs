// src/motion/scheduler.rs - Move progression state machine
//
// One tick = optional LOAD (arm the next move) followed by a RUN evaluation
// (interpolate or snap to the exact target). Everything runs on the caller's
// thread; nothing in here blocks.
use crate::config::{Config, ConfigError};
use crate::gcode::command::Command;
use crate::hardware::{LaserDriver, ModifierHandler, ScannerDriver};
use crate::motion::interpolator::{
    elapsed_fraction, interpolate, move_duration_nanos, CoordinateMap,
};
use crate::motion::ledger::{Point3, PositionLedger};
use crate::motion::pipeline::MovePipeline;
use crate::motion::queue::{CommandQueue, QueueError};
use crate::scheduler::TimeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Looking for the next motion command.
    Load,
    /// Current move is interpolating.
    Run,
    /// Nothing in flight and nothing queued.
    Idle,
}

/// Counters collected while ticking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub moves_completed: u64,
    pub interpolated_steps: u64,
    pub modifiers_dispatched: u64,
    pub degenerate_moves: u64,
    pub power_clamped: u64,
    /// Ticks that arrived later than the configured minimum tick rate allows.
    pub late_ticks: u64,
    /// Paced moves shorter than one tick interval.
    pub short_moves: u64,
    pub max_tick_gap_nanos: u64,
}

pub struct MotionScheduler<S, L, M, C> {
    queue: CommandQueue,
    modifiers: CommandQueue,
    pipeline: MovePipeline,
    ledger: PositionLedger,
    target: Point3,
    map: CoordinateMap,
    state: SchedulerState,
    start_nanos: u64,
    deadline_nanos: u64,
    last_tick_nanos: Option<u64>,
    max_power: u32,
    max_tick_interval_nanos: u64,
    legacy_modifier_order: bool,
    stats: SchedulerStats,
    scanner: S,
    laser: L,
    handler: M,
    clock: C,
}

impl<S, L, M, C> MotionScheduler<S, L, M, C>
where
    S: ScannerDriver,
    L: LaserDriver,
    M: ModifierHandler,
    C: TimeSource,
{
    /// Validates `config` first; a zero-capacity queue or an empty logical
    /// span is rejected here rather than panicking or mapping everything to 0.
    pub fn new(
        config: &Config,
        scanner: S,
        laser: L,
        handler: M,
        clock: C,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.motion.queue_capacity;
        let origin = config.scanner.origin();
        tracing::debug!(
            "Motion scheduler: queue capacity {}, origin ({}, {}), max power {}",
            capacity,
            origin.x,
            origin.y,
            config.laser.max_power
        );
        Ok(Self {
            queue: CommandQueue::new(capacity),
            modifiers: CommandQueue::new(capacity),
            pipeline: MovePipeline::new(),
            ledger: PositionLedger::new(origin, config.motion.default_feedrate),
            target: origin,
            map: CoordinateMap::new(&config.scanner),
            state: SchedulerState::Idle,
            start_nanos: 0,
            deadline_nanos: 0,
            last_tick_nanos: None,
            max_power: config.laser.max_power,
            max_tick_interval_nanos: config.motion.max_tick_interval_nanos(),
            legacy_modifier_order: config.motion.legacy_modifier_order,
            stats: SchedulerStats::default(),
            scanner,
            laser,
            handler,
            clock,
        })
    }

    /// Command Source entry point. A full queue hands the command back.
    pub fn enqueue(&mut self, cmd: Command) -> Result<(), QueueError> {
        self.queue.enqueue(cmd).inspect_err(|e| {
            tracing::warn!("{}", e);
        })
    }

    /// Primary queue, for producers that manage their own back-pressure.
    pub fn queue_mut(&mut self) -> &mut CommandQueue {
        &mut self.queue
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Run one scheduler step at the current clock time.
    pub fn tick(&mut self) {
        let now = self.clock.now_nanos();
        self.track_tick_gap(now);
        self.stats.ticks += 1;

        if self.state != SchedulerState::Run {
            self.load(now);
        }
        self.run(now);
    }

    fn track_tick_gap(&mut self, now: u64) {
        if let Some(last) = self.last_tick_nanos {
            let gap = now.saturating_sub(last);
            self.stats.max_tick_gap_nanos = self.stats.max_tick_gap_nanos.max(gap);
            if self.state == SchedulerState::Run && gap > self.max_tick_interval_nanos {
                self.stats.late_ticks += 1;
                tracing::debug!(
                    "Late tick: {} ns since last (limit {} ns)",
                    gap,
                    self.max_tick_interval_nanos
                );
            }
        }
        self.last_tick_nanos = Some(now);
    }

    fn load(&mut self, now: u64) {
        // Modifiers collected behind the finished move go out before anything
        // else starts.
        while let Some(cmd) = self.modifiers.dequeue() {
            tracing::debug!("Dispatching modifier {}", cmd);
            self.handler.execute(&cmd);
            self.stats.modifiers_dispatched += 1;
        }

        self.pipeline.advance();
        let next = self.scan_for_motion();
        self.pipeline.set_next(next);

        if let Some(previous) = self.pipeline.previous() {
            self.ledger.commit_axes(previous);
        }

        let Some(current) = self.pipeline.current() else {
            self.state = if self.pipeline.next().is_some() || !self.queue.is_empty() {
                SchedulerState::Load
            } else {
                SchedulerState::Idle
            };
            return;
        };
        self.target = self.ledger.resolve_target(current);
        self.ledger.apply_modal(current);
        let rapid = current.is_rapid();

        let duration = if rapid {
            self.laser.set_power(0);
            0
        } else {
            let duration = self.paced_duration();
            let power = self.armed_power();
            self.laser.set_power(power);
            duration
        };
        if let Some(current) = self.pipeline.current_mut() {
            current.duration_nanos = duration;
        }
        self.start_nanos = now;
        self.deadline_nanos = now.saturating_add(duration);
        tracing::debug!(
            "Armed {} move to ({:.3}, {:.3}) over {} ns",
            if rapid { "rapid" } else { "paced" },
            self.target.x,
            self.target.y,
            duration
        );
        self.state = SchedulerState::Run;
    }

    /// Pull from the primary queue until a motion command turns up, parking
    /// modifiers in the modifier queue on the way.
    fn scan_for_motion(&mut self) -> Option<Command> {
        while let Some(cmd) = self.queue.dequeue() {
            if cmd.is_motion() {
                return Some(cmd);
            }
            let parked = if self.legacy_modifier_order {
                self.modifiers.requeue_front(cmd)
            } else {
                self.modifiers.enqueue(cmd)
            };
            if let Err(QueueError::Full(cmd)) = parked {
                // Leave it at the head of the primary queue; the next LOAD
                // drains the modifier queue first, so order is kept.
                tracing::warn!("Modifier queue full, deferring {}", cmd);
                if let Err(QueueError::Full(cmd)) = self.queue.requeue_front(cmd) {
                    tracing::error!("Dropping {}: both queues full", cmd);
                }
                return None;
            }
        }
        None
    }

    fn paced_duration(&mut self) -> u64 {
        let distance = self.ledger.position.distance_xy(&self.target);
        let duration = match move_duration_nanos(distance, self.ledger.feedrate) {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!("{}; completing move immediately", e);
                self.stats.degenerate_moves += 1;
                0
            }
        };
        if duration > 0 && duration < self.max_tick_interval_nanos {
            self.stats.short_moves += 1;
        }
        duration
    }

    fn armed_power(&mut self) -> u32 {
        let power = self.ledger.power;
        if power > self.max_power {
            tracing::warn!("Power {} above laser maximum {}, clamping", power, self.max_power);
            self.stats.power_clamped += 1;
            return self.max_power;
        }
        power
    }

    fn run(&mut self, now: u64) {
        let Some(current) = self.pipeline.current() else {
            return;
        };
        if current.is_rapid() || now >= self.deadline_nanos {
            self.laser.tick();
            let digital = self.map.to_digital(&self.target);
            self.scanner.move_to(digital.x, digital.y);
            self.stats.moves_completed += 1;
            tracing::debug!("Move complete at ({}, {})", digital.x, digital.y);
            self.state = SchedulerState::Load;
            return;
        }

        let fraction = elapsed_fraction(self.start_nanos, now, current.duration_nanos);
        let point = interpolate(&self.ledger.position, &self.target, fraction);
        let digital = self.map.to_digital(&point);
        self.laser.tick();
        self.scanner.move_to(digital.x, digital.y);
        self.stats.interpolated_steps += 1;
        tracing::trace!("Interpolated {:.4} -> ({}, {})", fraction, digital.x, digital.y);
    }

    /// No move in flight and both queues empty.
    pub fn is_idle(&self) -> bool {
        self.state != SchedulerState::Run
            && self.pipeline.is_drained()
            && self.queue.is_empty()
            && self.modifiers.is_empty()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    /// Resolved target of the current (or most recently armed) move.
    pub fn target(&self) -> Point3 {
        self.target
    }

    pub fn current(&self) -> Option<&Command> {
        self.pipeline.current()
    }

    pub fn pending_modifiers(&self) -> usize {
        self.modifiers.len()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn coordinate_map(&self) -> &CoordinateMap {
        &self.map
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn laser(&self) -> &L {
        &self.laser
    }

    pub fn handler(&self) -> &M {
        &self.handler
    }
}
