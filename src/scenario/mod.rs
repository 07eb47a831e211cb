// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Scenario module - serde description of a home
//!
//! Walls and doors reference named points; sensors and devices carry their
//! own coordinates. [`Scenario::build`] resolves everything into the sensors,
//! devices and [`Layout`] the engine runs on.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::{Command, ScriptStep};
use crate::devices::{Device, DeviceKind};
use crate::error::{Result, SimError};
use crate::geometry::{Door, DoorState, Layout, NamedPoint, Point, Segment};
use crate::sensors::{Sensor, SensorKind};

/// Resolved home, ready for the engine
#[derive(Debug, Clone, Default)]
pub struct Home {
    pub sensors: Vec<Sensor>,
    pub devices: Vec<Device>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSpec {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

/// Segment between two named points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorSpec {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub state: DoorState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub id: String,
    pub kind: SensorKind,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: String,
    pub kind: DeviceKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub on: bool,
}

/// Serializable home description with an optional interaction script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    /// Preferred simulated start time ("HH:MM")
    pub start_time: Option<String>,
    pub points: Vec<PointSpec>,
    pub walls: Vec<SegmentSpec>,
    pub doors: Vec<DoorSpec>,
    pub sensors: Vec<SensorSpec>,
    pub devices: Vec<DeviceSpec>,
    pub script: Vec<ScriptStep>,
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = toml::from_str(&content)?;
        info!("Loaded scenario {:?} from {:?}", scenario.name, path);
        Ok(scenario)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve point names and validate references
    pub fn build(&self) -> Result<Home> {
        let points: HashMap<&str, Point> = self
            .points
            .iter()
            .map(|p| (p.name.as_str(), Point::new(p.x, p.y)))
            .collect();
        let resolve = |name: &str| {
            points
                .get(name)
                .copied()
                .ok_or_else(|| SimError::UnknownPoint { name: name.to_string() })
        };

        let walls = self
            .walls
            .iter()
            .map(|w| -> Result<Segment> { Ok(Segment::new(resolve(&w.from)?, resolve(&w.to)?)) })
            .collect::<Result<Vec<_>>>()?;
        let doors = self
            .doors
            .iter()
            .map(|d| -> Result<Door> { Ok(Door::new(Segment::new(resolve(&d.from)?, resolve(&d.to)?), d.state)) })
            .collect::<Result<Vec<_>>>()?;

        let devices: Vec<Device> = self
            .devices
            .iter()
            .map(|d| {
                let mut device = Device::new(&d.id, d.kind, Point::new(d.x, d.y));
                device.on = d.on;
                device
            })
            .collect();

        let mut sensors = Vec::with_capacity(self.sensors.len());
        for spec in &self.sensors {
            let mut sensor = Sensor::new(&spec.id, spec.kind, Point::new(spec.x, spec.y));
            if let Some(degrees) = spec.orientation {
                sensor = sensor.with_orientation(degrees);
            }
            if let Some(device_id) = spec.device.as_deref() {
                if !devices.iter().any(|d| d.id == device_id) {
                    return Err(SimError::UnknownDevice {
                        sensor: spec.id.clone(),
                        device: device_id.to_string(),
                    });
                }
                sensor = sensor.with_device(device_id);
            }
            if let Some(value) = spec.value {
                sensor = sensor.with_value(value);
            }
            sensors.push(sensor);
        }

        let layout = Layout {
            walls,
            doors,
            points: self
                .points
                .iter()
                .map(|p| NamedPoint { name: p.name.clone(), position: Point::new(p.x, p.y) })
                .collect(),
        };

        info!(
            "Scenario {:?}: {} sensors, {} devices, {} walls, {} doors",
            self.name,
            sensors.len(),
            devices.len(),
            layout.walls.len(),
            layout.doors.len()
        );
        Ok(Home { sensors, devices, layout })
    }

    /// Two-room apartment: kitchen with dining table on the west side,
    /// bedroom-office on the east, entrance on the west wall.
    pub fn demo() -> Self {
        let point = |name: &str, x: f64, y: f64| PointSpec { name: name.to_string(), x, y };
        let wall = |from: &str, to: &str| SegmentSpec { from: from.to_string(), to: to.to_string() };
        let sensor = |id: &str, kind: SensorKind, x: f64, y: f64| SensorSpec {
            id: id.to_string(),
            kind,
            x,
            y,
            orientation: None,
            device: None,
            value: None,
        };
        let device = |id: &str, kind: DeviceKind, x: f64, y: f64| DeviceSpec {
            id: id.to_string(),
            kind,
            x,
            y,
            on: false,
        };

        Scenario {
            name: "demo apartment".to_string(),
            start_time: Some("07:30".to_string()),
            points: vec![
                point("nw", 0.0, 0.0),
                point("ne", 600.0, 0.0),
                point("se", 600.0, 400.0),
                point("sw", 0.0, 400.0),
                point("entry_top", 0.0, 150.0),
                point("entry_bottom", 0.0, 250.0),
                point("mid_top", 300.0, 0.0),
                point("mid_door_top", 300.0, 150.0),
                point("mid_door_bottom", 300.0, 250.0),
                point("mid_bottom", 300.0, 400.0),
                point("table1", 100.0, 110.0),
                point("bed1", 500.0, 300.0),
            ],
            walls: vec![
                wall("nw", "ne"),
                wall("ne", "se"),
                wall("se", "sw"),
                wall("sw", "entry_bottom"),
                wall("entry_top", "nw"),
                wall("mid_top", "mid_door_top"),
                wall("mid_door_bottom", "mid_bottom"),
            ],
            doors: vec![
                DoorSpec { from: "entry_top".to_string(), to: "entry_bottom".to_string(), state: DoorState::Closed },
                DoorSpec { from: "mid_door_top".to_string(), to: "mid_door_bottom".to_string(), state: DoorState::Open },
            ],
            sensors: vec![
                SensorSpec { orientation: Some(180.0), ..sensor("kitchen_pir", SensorKind::Motion, 200.0, 60.0) },
                SensorSpec { orientation: Some(0.0), ..sensor("hall_pir", SensorKind::Motion, 40.0, 200.0) },
                SensorSpec { orientation: Some(180.0), ..sensor("bedroom_pir", SensorKind::Motion, 560.0, 200.0) },
                sensor("kitchen_temp", SensorKind::Temperature, 80.0, 60.0),
                sensor("entrance", SensorKind::Switch, 10.0, 200.0),
                sensor("chair_w", SensorKind::Weight, 100.0, 100.0),
                sensor("bed_w", SensorKind::Weight, 505.0, 300.0),
                SensorSpec { device: Some("pc".to_string()), ..sensor("pc_meter", SensorKind::PowerMeter, 450.0, 90.0) },
                SensorSpec { device: Some("washer".to_string()), ..sensor("washer_meter", SensorKind::PowerMeter, 560.0, 70.0) },
                SensorSpec {
                    device: Some("dishwasher".to_string()),
                    ..sensor("dishwasher_meter", SensorKind::PowerMeter, 140.0, 30.0)
                },
            ],
            devices: vec![
                device("oven1", DeviceKind::Oven, 60.0, 60.0),
                DeviceSpec { on: true, ..device("fridge", DeviceKind::Fridge, 20.0, 30.0) },
                device("pc", DeviceKind::Computer, 450.0, 80.0),
                device("washer", DeviceKind::WashingMachine, 560.0, 60.0),
                device("dishwasher", DeviceKind::Dishwasher, 140.0, 20.0),
            ],
            script: Self::demo_script(),
        }
    }

    /// A morning in the demo apartment, one step per simulated minute:
    /// cook, eat breakfast, work, start the laundry, nap, leave and return.
    pub fn demo_script() -> Vec<ScriptStep> {
        let walk = |at_tick: u64, x: f64, y: f64| {
            ScriptStep::new(at_tick, Command::MoveOccupant { to: Point::new(x, y) })
        };
        vec![
            // oven on, watched by the kitchen sensor
            walk(1, 60.0, 60.0),
            // oven off
            walk(6, 60.0, 60.0),
            // sit at the table
            walk(7, 100.0, 100.0),
            // computer on
            walk(25, 450.0, 80.0),
            // washing machine on
            walk(30, 560.0, 60.0),
            // lie down
            walk(40, 505.0, 300.0),
            // computer off
            walk(60, 450.0, 80.0),
            // dishwasher on
            walk(61, 140.0, 20.0),
            // open and close the entrance, then nobody moves
            walk(65, 2.0, 200.0),
            walk(66, 2.0, 200.0),
            // come back in
            walk(80, 2.0, 200.0),
            walk(81, 2.0, 200.0),
            walk(82, 60.0, 200.0),
        ]
    }
}
