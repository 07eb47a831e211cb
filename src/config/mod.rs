// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Log level
    pub log_level: String,

    /// Run the built-in demo apartment and script
    pub demo_mode: bool,

    /// Scenario file (TOML) describing the home
    pub scenario: Option<PathBuf>,

    /// Clock and scheduler settings
    pub simulation: SimulationConfig,

    /// Detector thresholds
    pub detection: DetectionConfig,

    /// Occupant interaction radii
    pub interaction: InteractionConfig,

    /// Environment model
    pub environment: EnvironmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "HomeSim".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            demo_mode: false,
            scenario: None,
            simulation: SimulationConfig::default(),
            detection: DetectionConfig::default(),
            interaction: InteractionConfig::default(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Max tracing level named by `log_level`, INFO when unrecognised
    pub fn max_log_level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("homesim"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Clock and scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated start time of day ("HH:MM")
    pub start_time: String,

    /// Real milliseconds between scheduler ticks
    pub tick_interval_ms: u64,

    /// Simulated minutes per elapsed second
    pub minutes_per_second: u32,

    /// Fast-forward increment in seconds
    pub advance_step_secs: u64,

    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: "08:00".to_string(),
            tick_interval_ms: 1000,
            minutes_per_second: 1,
            advance_step_secs: 15,
            max_ticks: None,
        }
    }
}

/// A meal slot, `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl MealWindow {
    pub const fn new(start_hour: u32, end_hour: u32) -> Self {
        Self { start_hour, end_hour }
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..self.end_hour).contains(&hour)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealWindows {
    pub breakfast: MealWindow,
    pub lunch: MealWindow,
    pub dinner: MealWindow,
}

impl Default for MealWindows {
    fn default() -> Self {
        Self {
            breakfast: MealWindow::new(7, 9),
            lunch: MealWindow::new(12, 14),
            dinner: MealWindow::new(20, 22),
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Motion sensor field of view in degrees
    pub fov_angle: f64,

    /// Motion sensor range
    pub fov_radius: f64,

    /// Exit/return confirmation window in simulated seconds
    pub confirmation_window_secs: u64,

    /// Sustained bed occupancy before "sleeping"
    pub sleep_min_secs: u64,

    /// Sustained table occupancy before a meal is confirmed
    pub meal_min_secs: u64,

    /// Max distance from a weight sensor to a bed point (exclusive)
    pub bed_radius: f64,

    /// Max distance from a weight sensor to a table point (inclusive)
    pub table_radius: f64,

    /// Name of the contact switch on the entrance door
    pub entry_switch: String,

    pub meal_windows: MealWindows,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fov_angle: 60.0,
            fov_radius: 150.0,
            confirmation_window_secs: 5,
            sleep_min_secs: 10,
            meal_min_secs: 10,
            bed_radius: 30.0,
            table_radius: 40.0,
            entry_switch: "entrance".to_string(),
            meal_windows: MealWindows::default(),
        }
    }
}

/// Occupant interaction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Range of a motion sensor picking up the occupant
    pub motion_range: f64,

    /// Motion field of view used for interaction
    pub fov_angle: f64,

    /// Weight sensors within this radius of the occupant are pressed
    pub weight_radius: f64,

    /// Devices within this radius of the occupant toggle
    pub device_radius: f64,

    /// Doors within this distance of the occupant toggle
    pub door_tolerance: f64,

    /// Switches within this radius of a door midpoint follow the door
    pub switch_door_radius: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            motion_range: 230.0,
            fov_angle: 60.0,
            weight_radius: 10.0,
            device_radius: 5.0,
            door_tolerance: 5.0,
            switch_door_radius: 50.0,
        }
    }
}

/// Environment model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Temperature sensors within this radius of a running oven heat up
    pub oven_heat_radius: f64,

    /// A meter reads 1 above this draw
    pub meter_threshold_watts: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            oven_heat_radius: 50.0,
            meter_threshold_watts: 1.0,
        }
    }
}
