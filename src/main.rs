// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! HomeSim - Smart-Home Sensor Simulator
//!
//! Runs a home scenario headless, ticking the simulated clock and printing
//! activity sessions as the detectors open and close them.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use homesim::core::{ActivityEventKind, Engine, Scheduler};
use homesim::{Config, Scenario, VERSION};

/// HomeSim - Smart-Home Sensor Simulator
#[derive(Parser, Debug)]
#[command(name = "homesim")]
#[command(author = "HomeSim Project")]
#[command(version = VERSION)]
#[command(about = "Simulate a sensor-equipped home and infer occupant activities")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario file (TOML)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Simulated start time (HH:MM)
    #[arg(long)]
    start: Option<String>,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Wall-clock milliseconds per tick
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with the built-in apartment and morning script
    #[arg(long)]
    demo: bool,

    /// Print every emitted event as a JSON line
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging: flags win over the configured level
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.max_log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} - Smart-Home Sensor Simulator", config.app_name, VERSION);

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(scenario) = args.scenario {
        config.scenario = Some(scenario);
    }
    if let Some(start) = args.start {
        config.simulation.start_time = start;
    }
    if args.ticks.is_some() {
        config.simulation.max_ticks = args.ticks;
    }
    if let Some(ms) = args.tick_ms {
        config.simulation.tick_interval_ms = ms;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.demo_mode);

    let scenario = match (&config.scenario, config.demo_mode) {
        (Some(path), _) => {
            Scenario::load(path).with_context(|| format!("loading scenario {:?}", path))?
        }
        (None, true) => Scenario::demo(),
        (None, false) => {
            anyhow::bail!("No scenario given. Pass --scenario <file> or use --demo");
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config, scenario, args.json))
}

/// Run the scenario until its ticks run out, it stops itself, or Ctrl+C
async fn run_headless(config: Config, scenario: Scenario, json: bool) -> Result<()> {
    let home = scenario.build()?;
    let start_time = scenario
        .start_time
        .clone()
        .unwrap_or_else(|| config.simulation.start_time.clone());
    let simulation = config.simulation.clone();

    let mut engine = Engine::new(config, home);
    let bus = engine.event_bus();

    let printer = if json {
        let mut events = bus.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{}", line),
                        Err(e) => warn!("Failed to encode event: {}", e),
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => warn!("Dropped {} events", n),
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    } else {
        let mut activities = bus.subscribe_activities();
        tokio::spawn(async move {
            loop {
                match activities.recv().await {
                    Ok(event) => {
                        let verb = match event.kind {
                            ActivityEventKind::Start => "started",
                            ActivityEventKind::End => "ended",
                        };
                        println!("{}  {} {}", event.timestamp, event.label, verb);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => warn!("Dropped {} activity events", n),
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, cleaning up...");
            let _ = shutdown_tx.send(());
        }
    });

    engine.start(&start_time)?;
    info!("Running {:?} with {} sensors", scenario.name, engine.sensors().len());
    info!("   Press Ctrl+C to shutdown");

    let (scheduler, _commands) = Scheduler::new(&simulation);
    let ticks = scheduler
        .with_script(scenario.script.clone())
        .run(&mut engine, shutdown_rx)
        .await?;

    let state = engine.state();
    info!(
        "Simulation finished after {} ticks: {} sessions, {} detector failures",
        ticks, state.closed_sessions, state.detector_failures
    );

    // the bus lives in the engine; dropping both closes the printer's channel
    drop(engine);
    drop(bus);
    let _ = printer.await;

    info!("HomeSim shutdown complete");
    Ok(())
}
