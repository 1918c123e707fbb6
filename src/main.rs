// src/main.rs - Cooperative control loop driving simulated scanner and laser
use clap::Parser;
use galvo_rs::config::{self, Config};
use galvo_rs::gcode::GCodeReader;
use galvo_rs::hardware::{LoggingModifierHandler, SimLaser, SimScanner};
use galvo_rs::motion::MotionScheduler;
use galvo_rs::scheduler::MonotonicClock;
use std::path::PathBuf;
use tokio::io::BufReader;

/// Stream a G-code job through the motion scheduler.
#[derive(Parser, Debug)]
#[command(name = "galvo-host", about = "Galvo scanner motion/laser synchronization host.")]
struct Cli {
    /// G-code file to run
    input: PathBuf,

    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("Starting galvo-host");

    let config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            tracing::info!("Loading configuration from: {}", path);
            config::load_config(&path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path, e);
                Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
            })?
        }
        None => Config::default(),
    };

    tracing::info!(
        "Scanner span {}..{} -> 0..{} (invert x: {}, invert y: {})",
        config.scanner.logical_min,
        config.scanner.logical_max,
        config.scanner.digital_max,
        config.scanner.invert_x,
        config.scanner.invert_y
    );
    tracing::info!(
        "Queue capacity {}, minimum tick rate {} Hz",
        config.motion.queue_capacity,
        config.motion.min_tick_rate_hz
    );

    let file = tokio::fs::File::open(&cli.input).await?;
    let mut reader = GCodeReader::new(BufReader::new(file));
    let mut scheduler = MotionScheduler::new(
        &config,
        SimScanner::default(),
        SimLaser::default(),
        LoggingModifierHandler::default(),
        MonotonicClock::new(),
    )?;

    // Ingest, then tick, forever until the job is drained.
    loop {
        if !reader.is_done() {
            reader.poll(scheduler.queue_mut()).await?;
        }
        scheduler.tick();
        if reader.is_done() && scheduler.is_idle() {
            break;
        }
    }

    let stats = scheduler.stats();
    tracing::info!(
        "Job complete: {} lines, {} moves, {} interpolation steps, {} modifiers",
        reader.lines_read(),
        stats.moves_completed,
        stats.interpolated_steps,
        stats.modifiers_dispatched
    );
    if reader.parse_errors() > 0 {
        tracing::warn!("{} lines could not be parsed", reader.parse_errors());
    }
    if stats.degenerate_moves > 0 {
        tracing::warn!("{} moves had no usable feedrate", stats.degenerate_moves);
    }
    if stats.late_ticks > 0 {
        tracing::warn!(
            "{} late ticks (worst gap {} ns); trajectories may be distorted",
            stats.late_ticks,
            stats.max_tick_gap_nanos
        );
    }
    if let Some((x, y)) = scheduler.scanner().position {
        tracing::info!("Final galvo position ({}, {})", x, y);
    }

    Ok(())
}
