//! Device module - controllable appliances and their power draw

mod consumption;

pub use consumption::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::geometry::Point;
use crate::sensors::{number, optional_number};

/// Appliance kinds with a consumption profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    Oven,
    Fridge,
    WashingMachine,
    Dishwasher,
    Computer,
    CoffeeMachine,
}

impl DeviceKind {
    /// Kinds whose cycle survives on/off flips and never ends on its own
    pub fn is_continuous(self) -> bool {
        matches!(self, DeviceKind::Fridge | DeviceKind::Computer)
    }
}

impl FromStr for DeviceKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | ' ' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "oven" => Ok(DeviceKind::Oven),
            "fridge" | "refrigerator" => Ok(DeviceKind::Fridge),
            "washingmachine" | "washer" => Ok(DeviceKind::WashingMachine),
            "dishwasher" => Ok(DeviceKind::Dishwasher),
            "computer" => Ok(DeviceKind::Computer),
            "coffeemachine" => Ok(DeviceKind::CoffeeMachine),
            _ => Err(SimError::UnknownKind { kind: s.to_string() }),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Oven => "Oven",
            DeviceKind::Fridge => "Fridge",
            DeviceKind::WashingMachine => "Washing_Machine",
            DeviceKind::Dishwasher => "Dishwasher",
            DeviceKind::Computer => "Computer",
            DeviceKind::CoffeeMachine => "Coffee_Machine",
        };
        f.write_str(name)
    }
}

/// An appliance on the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub kind: DeviceKind,
    pub position: Point,
    pub on: bool,
    /// Instantaneous draw in watts
    pub consumption: f64,
}

impl Device {
    pub fn new(id: &str, kind: DeviceKind, position: Point) -> Self {
        Self {
            id: id.to_string(),
            kind,
            position,
            on: false,
            consumption: 0.0,
        }
    }

    pub fn switched_on(mut self) -> Self {
        self.on = true;
        self
    }

    /// Parse the 10-field positional row:
    /// `name, x, y, type, power, state, min_c, max_c, current_consumption, direction`
    pub fn from_record(fields: &[&str]) -> Result<Self> {
        const RECORD: &str = "device";
        if fields.len() != 10 {
            return Err(SimError::MalformedRecord { record: RECORD, expected: 10, found: fields.len() });
        }

        let id = fields[0].trim();
        if id.is_empty() {
            return Err(SimError::InvalidField { record: RECORD, field: "name", value: String::new() });
        }
        let kind: DeviceKind = fields[3].parse()?;
        let position = Point::new(number(RECORD, "x", fields[1])?, number(RECORD, "y", fields[2])?);
        let state = number(RECORD, "state", fields[5])?;

        let mut device = Device::new(id, kind, position);
        device.on = state != 0.0;
        device.consumption = optional_number(RECORD, "consumption", fields[8])?.unwrap_or(0.0);
        if !device.on {
            device.consumption = 0.0;
        }
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Washing_Machine".parse::<DeviceKind>().unwrap(), DeviceKind::WashingMachine);
        assert_eq!("coffee machine".parse::<DeviceKind>().unwrap(), DeviceKind::CoffeeMachine);
        assert_eq!(DeviceKind::WashingMachine.to_string(), "Washing_Machine");
        assert!("Toaster".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn test_from_record() {
        let row = ["oven1", "200", "40", "Oven", "2000", "1", "1500", "2000", "942.8", "1"];
        let device = Device::from_record(&row).unwrap();
        assert_eq!(device.kind, DeviceKind::Oven);
        assert!(device.on);
        assert_eq!(device.consumption, 942.8);
    }

    #[test]
    fn test_malformed_record() {
        let row = ["oven1", "200", "40", "Oven", "2000"];
        assert_eq!(
            Device::from_record(&row),
            Err(SimError::MalformedRecord { record: "device", expected: 10, found: 5 })
        );
    }

    #[test]
    fn test_continuous_kinds() {
        assert!(DeviceKind::Fridge.is_continuous());
        assert!(DeviceKind::Computer.is_continuous());
        assert!(!DeviceKind::Oven.is_continuous());
    }
}
