// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! HomeSim - Smart-Home Sensor Simulator with Activity Inference
//!
//! Simulates a home equipped with motion, switch, weight, temperature and
//! power-meter sensors, and infers what the occupant is doing from the
//! readings:
//! - 2D floor plan with walls, doors and visibility queries
//! - Simulated clock running at a configurable speed-up
//! - Device power cycles driven by consumption profiles
//! - Eight debounced detectors (cooking, meals, sleep, chores, presence)
//! - Start/end session tracking per activity
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HomeSim Engine                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐  │
//! │  │ Clock   │→ │ Sensor   │→ │ Detection │→ │ Activity   │  │
//! │  │         │  │ Refresh  │  │ Engine    │  │ Tracker    │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └────────────┘  │
//! │       ↑            ↓             ↑              ↓          │
//! │  ┌─────────┐  ┌──────────┐  ┌───────────┐  ┌────────────┐  │
//! │  │Scheduler│  │ Sensor   │  │ Geometry  │  │ Event Bus  │  │
//! │  │         │  │ Store    │  │           │  │            │  │
//! │  └─────────┘  └──────────┘  └───────────┘  └────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![allow(dead_code)]

pub mod clock;
pub mod config;
pub mod core;
pub mod detection;
pub mod devices;
pub mod error;
pub mod geometry;
pub mod scenario;
pub mod sensors;

// Re-exports for convenience
pub use clock::{SimClock, SimulatedClock};
pub use config::Config;
pub use core::{Command, Engine, EventBus, Scheduler};
pub use detection::{ActivityLabel, DetectionEngine};
pub use devices::{Device, DeviceKind};
pub use error::{Result, SimError};
pub use scenario::{Home, Scenario};
pub use sensors::{Sensor, SensorKind, SensorStore};

/// HomeSim version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// HomeSim name
pub const NAME: &str = "HomeSim";

/// Build info
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: VERSION.to_string(),
        rust_version: env!("CARGO_PKG_RUST_VERSION").to_string(),
        target: std::env::consts::ARCH.to_string(),
        os: std::env::consts::OS.to_string(),
    }
}

/// Build information
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub rust_version: String,
    pub target: String,
    pub os: String,
}
