//! Sensor module - positional sensors, sample history and per-tick refresh

mod simulator;
mod store;

pub use simulator::{ConsumptionSample, RefreshReport, SensorSimulator, SensorValueSample};
pub use store::{EdgeCursor, Sample, SensorHistory, SensorStore};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::geometry::{Observer, Point};

/// Sensor kinds present in the home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Passive infrared, directional
    Motion,
    Temperature,
    /// Door contact switch
    Switch,
    /// Smart meter bound to one device
    PowerMeter,
    /// Pressure mat (bed, chair)
    Weight,
}

impl SensorKind {
    /// Kinds sampled as 0/1 on every tick
    pub fn is_binary(self) -> bool {
        matches!(self, SensorKind::Motion | SensorKind::Switch | SensorKind::Weight)
    }
}

impl FromStr for SensorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pir" | "motion" => Ok(SensorKind::Motion),
            "temperature" => Ok(SensorKind::Temperature),
            "switch" => Ok(SensorKind::Switch),
            "smart meter" | "smart_meter" | "powermeter" | "power_meter" => Ok(SensorKind::PowerMeter),
            "weight" => Ok(SensorKind::Weight),
            _ => Err(SimError::UnknownKind { kind: s.to_string() }),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::Motion => "PIR",
            SensorKind::Temperature => "Temperature",
            SensorKind::Switch => "Switch",
            SensorKind::PowerMeter => "Smart Meter",
            SensorKind::Weight => "Weight",
        };
        f.write_str(name)
    }
}

/// A sensor placed on the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub kind: SensorKind,
    pub position: Point,
    /// Facing direction in degrees (Motion only)
    pub orientation: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Current value
    pub value: f64,
    /// Last metered draw in watts (PowerMeter only)
    pub consumption: Option<f64>,
    /// Metered device id (PowerMeter only)
    pub device: Option<String>,
}

impl Sensor {
    /// New sensor with the default range and resting value for its kind
    pub fn new(id: &str, kind: SensorKind, position: Point) -> Self {
        let (min, max, step, value) = match kind {
            SensorKind::Motion | SensorKind::Weight => (0.0, 1.0, 1.0, 0.0),
            SensorKind::Switch => (0.0, 1.0, 1.0, 0.0),
            SensorKind::Temperature => (18.0, 35.0, 0.5, 18.0),
            SensorKind::PowerMeter => (0.0, 5000.0, 10.0, 0.0),
        };
        Self {
            id: id.to_string(),
            kind,
            position,
            orientation: (kind == SensorKind::Motion).then_some(0.0),
            min,
            max,
            step,
            value,
            consumption: (kind == SensorKind::PowerMeter).then_some(0.0),
            device: None,
        }
    }

    pub fn with_orientation(mut self, degrees: f64) -> Self {
        if self.kind == SensorKind::Motion {
            self.orientation = Some(degrees);
        }
        self
    }

    pub fn with_device(mut self, device_id: &str) -> Self {
        if self.kind == SensorKind::PowerMeter {
            self.device = Some(device_id.to_string());
        }
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Current value as 0/1 (anything that rounds to non-zero is on)
    pub fn binary_value(&self) -> f64 {
        if self.value.round() != 0.0 {
            1.0
        } else {
            0.0
        }
    }

    /// Parse the 11-field positional row:
    /// `name, x, y, type, min, max, step, state, direction, consumption, device`
    pub fn from_record(fields: &[&str]) -> Result<Self> {
        const RECORD: &str = "sensor";
        if fields.len() != 11 {
            return Err(SimError::MalformedRecord { record: RECORD, expected: 11, found: fields.len() });
        }

        let kind: SensorKind = fields[3].parse()?;
        let mut sensor = Sensor::new(
            fields[0].trim(),
            kind,
            Point::new(number(RECORD, "x", fields[1])?, number(RECORD, "y", fields[2])?),
        );
        sensor.min = number(RECORD, "min", fields[4])?;
        sensor.max = number(RECORD, "max", fields[5])?;
        sensor.step = number(RECORD, "step", fields[6])?;
        sensor.value = number(RECORD, "state", fields[7])?;

        if kind == SensorKind::Motion {
            sensor.orientation = Some(optional_number(RECORD, "direction", fields[8])?.unwrap_or(0.0));
        }
        if kind == SensorKind::PowerMeter {
            sensor.consumption = Some(optional_number(RECORD, "consumption", fields[9])?.unwrap_or(0.0));
            sensor.device = optional_text(fields[10]).map(str::to_string);
        }

        if sensor.id.is_empty() {
            return Err(SimError::InvalidField { record: RECORD, field: "name", value: String::new() });
        }
        Ok(sensor)
    }
}

impl Observer for Sensor {
    fn position(&self) -> Point {
        self.position
    }

    fn orientation(&self) -> Option<f64> {
        self.orientation
    }
}

fn optional_text(field: &str) -> Option<&str> {
    let field = field.trim();
    (!field.is_empty() && !field.eq_ignore_ascii_case("none")).then_some(field)
}

pub(crate) fn number(record: &'static str, field: &'static str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| SimError::InvalidField {
        record,
        field,
        value: value.to_string(),
    })
}

pub(crate) fn optional_number(record: &'static str, field: &'static str, value: &str) -> Result<Option<f64>> {
    optional_text(value).map(|v| number(record, field, v)).transpose()
}
