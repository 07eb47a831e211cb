// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Periodic tick driver
//!
//! Ticks the engine once per interval and applies queued commands between
//! ticks, so a tick never overlaps another tick or a command.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Engine;
use crate::clock::ClockStatus;
use crate::config::SimulationConfig;
use crate::geometry::Point;

/// Requests from collaborators, applied between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    MoveOccupant { to: Point },
    ToggleDevice { id: String },
    ToggleDoor { index: usize },
    /// Fast-forward by the configured step
    Advance,
    Pause,
    Resume,
    Stop,
}

/// A command replayed just before the `at_tick`-th tick (1-based)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_tick: u64,
    pub command: Command,
}

impl ScriptStep {
    pub fn new(at_tick: u64, command: Command) -> Self {
        Self { at_tick, command }
    }
}

pub struct Scheduler {
    interval: Duration,
    advance_step: Duration,
    max_ticks: Option<u64>,
    commands: mpsc::Receiver<Command>,
    script: VecDeque<ScriptStep>,
}

impl Scheduler {
    /// Scheduler plus the sender collaborators use to queue commands
    pub fn new(config: &SimulationConfig) -> (Self, mpsc::Sender<Command>) {
        let (tx, rx) = mpsc::channel(64);
        let scheduler = Self {
            interval: Duration::from_millis(config.tick_interval_ms.max(1)),
            advance_step: Duration::from_secs(config.advance_step_secs),
            max_ticks: config.max_ticks,
            commands: rx,
            script: VecDeque::new(),
        };
        (scheduler, tx)
    }

    /// Replay `steps` alongside queued commands
    pub fn with_script(mut self, mut steps: Vec<ScriptStep>) -> Self {
        steps.sort_by_key(|s| s.at_tick);
        self.script = steps.into();
        self
    }

    /// Drive `engine` until stopped, shut down, or out of ticks.
    /// Returns the number of ticks run while the clock was running.
    pub async fn run(self, engine: &mut Engine, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<u64> {
        let Scheduler {
            interval,
            advance_step,
            max_ticks,
            mut commands,
            mut script,
        } = self;

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of a tokio interval completes immediately
        ticker.tick().await;

        let mut ticks = 0u64;
        info!("Scheduler running every {:?}", interval);

        'run: loop {
            tokio::select! {
                _ = ticker.tick() => {
                    while script.front().is_some_and(|step| step.at_tick <= ticks + 1) {
                        let Some(step) = script.pop_front() else { break };
                        if step.command == Command::Stop {
                            break 'run;
                        }
                        apply(engine, step.command, advance_step);
                    }

                    let running = engine.is_running();
                    engine.step(Duration::from_secs(1))?;
                    if running {
                        ticks += 1;
                        if max_ticks.is_some_and(|max| ticks >= max) {
                            info!("Reached {} ticks", ticks);
                            break;
                        }
                    }
                }
                Some(command) = commands.recv() => {
                    if command == Command::Stop {
                        break;
                    }
                    apply(engine, command, advance_step);
                }
                _ = shutdown.recv() => {
                    info!("Scheduler shutting down");
                    break;
                }
            }
        }

        if engine.clock().status() != ClockStatus::Idle {
            engine.stop()?;
        }
        Ok(ticks)
    }
}

fn apply(engine: &mut Engine, command: Command, advance_step: Duration) {
    debug!("Applying {:?}", command);
    let result = match command {
        Command::MoveOccupant { to } => engine.move_occupant(to).map(|_| ()),
        Command::ToggleDevice { id } => engine.toggle_device(&id).map(|_| ()),
        Command::ToggleDoor { index } => engine.toggle_door(index).map(|_| ()),
        Command::Advance => engine.advance(advance_step),
        Command::Pause => {
            engine.pause();
            Ok(())
        }
        Command::Resume => {
            engine.resume();
            Ok(())
        }
        Command::Stop => Ok(()),
    };
    if let Err(e) = result {
        warn!("Command rejected: {}", e);
    }
}
