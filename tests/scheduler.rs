// Integration tests for the motion scheduler, driven by a manual clock and
// recording collaborators that log every call in order.

use galvo_rs::config::Config;
use galvo_rs::gcode::Command;
use galvo_rs::hardware::{LaserDriver, ModifierHandler, ScannerDriver};
use galvo_rs::motion::{DigitalPoint, MotionScheduler, Point3, QueueError, SchedulerState};
use galvo_rs::scheduler::ManualClock;
use std::cell::RefCell;
use std::rc::Rc;

const SECOND: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    MoveTo(u16, u16),
    SetPower(u32),
    LaserTick,
    Modifier(u32),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct Recorder(Log);

impl ScannerDriver for Recorder {
    fn move_to(&mut self, x: u16, y: u16) {
        self.0.borrow_mut().push(Event::MoveTo(x, y));
    }
}

impl LaserDriver for Recorder {
    fn set_power(&mut self, level: u32) {
        self.0.borrow_mut().push(Event::SetPower(level));
    }

    fn tick(&mut self) {
        self.0.borrow_mut().push(Event::LaserTick);
    }
}

impl ModifierHandler for Recorder {
    fn execute(&mut self, command: &Command) {
        self.0.borrow_mut().push(Event::Modifier(command.code));
    }
}

type TestScheduler = MotionScheduler<Recorder, Recorder, Recorder, ManualClock>;

fn setup(config: &Config) -> (TestScheduler, ManualClock, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let clock = ManualClock::new();
    let scheduler = MotionScheduler::new(
        config,
        Recorder(log.clone()),
        Recorder(log.clone()),
        Recorder(log.clone()),
        clock.clone(),
    )
    .unwrap();
    (scheduler, clock, log)
}

fn digital(sched: &TestScheduler, x: f64, y: f64) -> DigitalPoint {
    sched.coordinate_map().to_digital(&Point3::new(x, y, 0.0))
}

fn moves(log: &Log) -> Vec<(u16, u16)> {
    log.borrow()
        .iter()
        .filter_map(|e| match e {
            Event::MoveTo(x, y) => Some((*x, *y)),
            _ => None,
        })
        .collect()
}

/// Tick until the scheduler is idle, advancing the clock by `step` each time.
fn run_to_idle(sched: &mut TestScheduler, clock: &ManualClock, step: u64) {
    for _ in 0..100_000 {
        sched.tick();
        if sched.is_idle() {
            return;
        }
        clock.advance(step);
    }
    panic!("scheduler did not go idle");
}

#[test]
fn test_scenario_modifier_between_moves() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(10.0).with_y(0.0).with_feedrate(10.0)).unwrap();
    sched.enqueue(Command::modifier(3).with_power(50)).unwrap();
    sched.enqueue(Command::motion(1).with_x(10.0).with_y(10.0).with_feedrate(10.0)).unwrap();

    // Tick 1 only pre-fetches; tick 2 arms the first move.
    sched.tick();
    sched.tick();
    assert_eq!(sched.state(), SchedulerState::Run);
    assert_eq!(sched.pending_modifiers(), 1);

    // Finish the first move exactly on its target.
    clock.advance(SECOND);
    sched.tick();
    let first = digital(&sched, 10.0, 0.0);
    assert_eq!(moves(&log).last(), Some(&(first.x, first.y)));
    assert_eq!(sched.state(), SchedulerState::Load);

    // Arming the second move dispatches the modifier first.
    log.borrow_mut().clear();
    sched.tick();
    assert_eq!(sched.current().unwrap().duration_nanos, SECOND);
    assert_eq!(sched.ledger().position, Point3::new(10.0, 0.0, 0.0));
    {
        let events = log.borrow();
        let modifier_at = events.iter().position(|e| *e == Event::Modifier(3)).unwrap();
        let first_move_at = events.iter().position(|e| matches!(e, Event::MoveTo(..))).unwrap();
        assert!(modifier_at < first_move_at);
    }

    // y climbs monotonically toward 10 then snaps to (10, 10).
    for _ in 0..9 {
        clock.advance(SECOND / 10);
        sched.tick();
    }
    clock.advance(SECOND / 10);
    sched.tick();
    let ys: Vec<u16> = moves(&log).iter().map(|m| m.1).collect();
    assert!(ys.windows(2).all(|w| w[0] <= w[1]), "{:?}", ys);
    let last = digital(&sched, 10.0, 10.0);
    assert_eq!(moves(&log).last(), Some(&(last.x, last.y)));
    // Every intermediate x stays at 10
    assert!(moves(&log).iter().all(|m| m.0 == last.x));

    sched.tick();
    assert!(sched.is_idle());
    assert_eq!(sched.stats().moves_completed, 2);
    assert_eq!(sched.stats().modifiers_dispatched, 1);
}

#[test]
fn test_one_terminal_move_per_command_at_resolved_target() {
    let (mut sched, clock, log) = setup(&Config::default());
    let targets = [(12.5, 40.0), (100.0, 40.0), (100.0, 3.25), (0.0, 250.0)];
    sched.enqueue(Command::motion(1).with_x(12.5).with_y(40.0).with_feedrate(500.0)).unwrap();
    // Y omitted: carried over from the previous move
    sched.enqueue(Command::motion(1).with_x(100.0)).unwrap();
    sched.enqueue(Command::motion(1).with_y(3.25)).unwrap();
    sched.enqueue(Command::motion(0).with_x(0.0).with_y(250.0)).unwrap();

    let mut terminal = Vec::new();
    for _ in 0..100_000 {
        let before = sched.stats().moves_completed;
        sched.tick();
        if sched.stats().moves_completed > before {
            terminal.push(*moves(&log).last().unwrap());
        }
        if sched.is_idle() {
            break;
        }
        clock.advance(1_000_000);
    }

    assert_eq!(terminal.len(), targets.len());
    for ((x, y), (dx, dy)) in targets.iter().zip(terminal) {
        let expected = digital(&sched, *x, *y);
        assert!((expected.x as i32 - dx as i32).abs() <= 1);
        assert!((expected.y as i32 - dy as i32).abs() <= 1);
    }
    assert_eq!(sched.ledger().position, Point3::new(0.0, 250.0, 0.0));
}

#[test]
fn test_move_to_current_position_is_immediate() {
    let (mut sched, _clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(0.0).with_y(0.0).with_feedrate(10.0)).unwrap();
    sched.tick();
    sched.tick();

    assert_eq!(sched.current().unwrap().duration_nanos, 0);
    assert_eq!(sched.stats().moves_completed, 1);
    assert_eq!(sched.stats().interpolated_steps, 0);
    let origin = digital(&sched, 0.0, 0.0);
    assert_eq!(moves(&log), vec![(origin.x, origin.y)]);
}

#[test]
fn test_rapid_moves_never_emit() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(5.0).with_power(200)).unwrap();
    sched.enqueue(Command::motion(0).with_x(200.0).with_y(200.0).with_power(120)).unwrap();
    sched.enqueue(Command::motion(0).with_x(10.0)).unwrap();

    let mut rapid_durations = Vec::new();
    for _ in 0..10_000 {
        sched.tick();
        if let Some(cmd) = sched.current() {
            if cmd.is_rapid() {
                rapid_durations.push(cmd.duration_nanos);
            }
        }
        if sched.is_idle() {
            break;
        }
        clock.advance(1_000_000);
    }

    assert!(!rapid_durations.is_empty());
    assert!(rapid_durations.iter().all(|d| *d == 0));
    let powers: Vec<u32> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::SetPower(p) => Some(*p),
            _ => None,
        })
        .collect();
    // Paced move arms 200, both rapids force 0
    assert_eq!(powers, vec![200, 0, 0]);
}

#[test]
fn test_rapid_keeps_modal_power_for_later_moves() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(0).with_x(5.0).with_power(90)).unwrap();
    sched.enqueue(Command::motion(1).with_x(6.0)).unwrap();
    run_to_idle(&mut sched, &clock, 1_000_000);
    assert!(log.borrow().contains(&Event::SetPower(90)));
    assert_eq!(sched.ledger().power, 90);
}

#[test]
fn test_zero_feedrate_does_not_stall() {
    let (mut sched, _clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(50.0).with_y(50.0).with_feedrate(0.0)).unwrap();
    sched.tick();
    sched.tick();

    assert_eq!(sched.stats().degenerate_moves, 1);
    assert_eq!(sched.stats().moves_completed, 1);
    assert_eq!(sched.current().unwrap().duration_nanos, 0);
    let target = digital(&sched, 50.0, 50.0);
    assert_eq!(moves(&log), vec![(target.x, target.y)]);
    sched.tick();
    assert!(sched.is_idle());
}

#[test]
fn test_negative_feedrate_snaps_to_target() {
    let (mut sched, _clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(20.0).with_y(30.0).with_feedrate(-5.0)).unwrap();
    sched.tick();
    sched.tick();

    assert_eq!(sched.stats().degenerate_moves, 1);
    assert_eq!(sched.stats().moves_completed, 1);
    let target = digital(&sched, 20.0, 30.0);
    assert_eq!(moves(&log), vec![(target.x, target.y)]);
    sched.tick();
    assert!(sched.is_idle());
    assert_eq!(moves(&log).len(), 1);
}

#[test]
fn test_modifiers_dispatched_in_queue_order() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(0).with_x(1.0)).unwrap();
    sched.enqueue(Command::modifier(3)).unwrap();
    sched.enqueue(Command::modifier(7)).unwrap();
    sched.enqueue(Command::modifier(5)).unwrap();
    sched.enqueue(Command::motion(0).with_x(2.0)).unwrap();
    run_to_idle(&mut sched, &clock, 1_000);

    let dispatched: Vec<u32> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Modifier(code) => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(dispatched, vec![3, 7, 5]);
}

#[test]
fn test_legacy_modifier_order_reverses() {
    let mut config = Config::default();
    config.motion.legacy_modifier_order = true;
    let (mut sched, clock, log) = setup(&config);
    sched.enqueue(Command::motion(0).with_x(1.0)).unwrap();
    sched.enqueue(Command::modifier(3)).unwrap();
    sched.enqueue(Command::modifier(7)).unwrap();
    sched.enqueue(Command::motion(0).with_x(2.0)).unwrap();
    run_to_idle(&mut sched, &clock, 1_000);

    let dispatched: Vec<u32> = log
        .borrow()
        .iter()
        .filter_map(|e| match e {
            Event::Modifier(code) => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(dispatched, vec![7, 3]);
}

#[test]
fn test_trailing_modifiers_flushed_when_idle() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(0).with_x(1.0)).unwrap();
    sched.enqueue(Command::modifier(5)).unwrap();
    run_to_idle(&mut sched, &clock, 1_000);
    assert!(log.borrow().contains(&Event::Modifier(5)));
    assert_eq!(sched.pending_modifiers(), 0);
}

#[test]
fn test_queue_overflow_signalled() {
    let mut config = Config::default();
    config.motion.queue_capacity = 2;
    let (mut sched, _clock, _log) = setup(&config);
    sched.enqueue(Command::motion(0).with_x(1.0)).unwrap();
    sched.enqueue(Command::motion(0).with_x(2.0)).unwrap();
    let err = sched.enqueue(Command::motion(0).with_x(3.0)).unwrap_err();
    assert!(matches!(err, QueueError::Full(cmd) if cmd.x == Some(3.0)));
    assert_eq!(sched.queue().rejected(), 1);
}

#[test]
fn test_late_tick_never_overshoots_target() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_y(100.0).with_feedrate(100.0)).unwrap();
    sched.tick();
    sched.tick();
    // Far past the one-second deadline
    clock.advance(7 * SECOND);
    sched.tick();
    let target = digital(&sched, 0.0, 100.0);
    assert_eq!(moves(&log).last(), Some(&(target.x, target.y)));
    assert!(moves(&log).iter().all(|m| m.1 <= target.y));
}

#[test]
fn test_laser_ticks_on_every_run_evaluation() {
    let (mut sched, clock, log) = setup(&Config::default());
    sched.enqueue(Command::motion(1).with_x(1.0).with_feedrate(10.0)).unwrap();
    run_to_idle(&mut sched, &clock, SECOND / 20);
    let events = log.borrow();
    let ticks = events.iter().filter(|e| **e == Event::LaserTick).count();
    let move_calls = events.iter().filter(|e| matches!(e, Event::MoveTo(..))).count();
    assert_eq!(ticks, move_calls);
    assert_eq!(sched.stats().interpolated_steps + 1, move_calls as u64);
}

#[test]
fn test_origin_seeds_ledger() {
    let mut config = Config::default();
    config.scanner.origin_x = 125.0;
    config.scanner.origin_y = 125.0;
    let (mut sched, _clock, _log) = setup(&config);
    // Only X given: Y resolves from the configured origin
    sched.enqueue(Command::motion(1).with_x(125.0).with_feedrate(10.0)).unwrap();
    sched.tick();
    sched.tick();
    assert_eq!(sched.target(), Point3::new(125.0, 125.0, 0.0));
    assert_eq!(sched.current().unwrap().duration_nanos, 0);
}
