//! Core module - engine, session tracking, event bus and tick scheduling

mod engine;
mod event_bus;
mod scheduler;
mod tracker;

pub use engine::{Engine, Interaction};
pub use event_bus::{Event, EventBus, EventPayload, EventType};
pub use scheduler::{Command, Scheduler, ScriptStep};
pub use tracker::{ActivityEvent, ActivityEventKind, ActivitySession, ActivityTracker};

use serde::{Deserialize, Serialize};

/// Simulation-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub running: bool,
    pub paused: bool,
    pub sensors: usize,
    pub devices: usize,
    pub ticks: u64,
    pub samples: usize,
    pub open_sessions: usize,
    pub closed_sessions: usize,
    pub detector_failures: u64,
    pub uptime_seconds: u64,
    /// Simulated "YYYY-MM-DD HH:MM" of the last tick
    pub simulated_time: Option<String>,
    /// Simulated time of the last activity start or end
    pub last_activity: Option<String>,
}
