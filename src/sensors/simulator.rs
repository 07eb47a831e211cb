// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Per-tick sensor and device refresh
//!
//! Runs before the detectors on every tick: device consumption first, then
//! temperature drift, power meters, and finally periodic sampling of every
//! binary sensor.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{Sensor, SensorKind, SensorStore};
use crate::clock::SimClock;
use crate::config::EnvironmentConfig;
use crate::devices::{ConsumptionModel, Device, DeviceKind};

/// Metered draw of one device at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionSample {
    pub device_id: String,
    pub timestamp: String,
    pub watts: f64,
}

/// Value recorded for one sensor at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorValueSample {
    pub sensor_id: String,
    pub timestamp: String,
    pub value: f64,
}

/// Everything a refresh produced
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub consumption: Vec<ConsumptionSample>,
    pub values: Vec<SensorValueSample>,
    /// Devices whose program ended this tick
    pub switched_off: Vec<String>,
}

/// Simulates the physical side of the home between detector runs
#[derive(Debug, Clone)]
pub struct SensorSimulator {
    config: EnvironmentConfig,
    last_elapsed: Option<Duration>,
    refreshes: u64,
}

impl SensorSimulator {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            last_elapsed: None,
            refreshes: 0,
        }
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Forget the previous refresh so the next one sees a zero time delta
    pub fn reset(&mut self) {
        self.last_elapsed = None;
        self.refreshes = 0;
    }

    pub fn refresh(
        &mut self,
        sensors: &mut [Sensor],
        devices: &mut [Device],
        model: &mut ConsumptionModel,
        store: &mut SensorStore,
        clock: &dyn SimClock,
    ) -> RefreshReport {
        let now = clock.now();
        let timestamp = clock.timestamp();
        let elapsed = clock.elapsed();
        let dt = self
            .last_elapsed
            .map(|last| elapsed.saturating_sub(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_elapsed = Some(elapsed);
        self.refreshes += 1;

        let mut report = RefreshReport::default();

        for update in model.refresh(devices, now) {
            if update.switched_off {
                report.switched_off.push(update.device_id.clone());
            }
            report.consumption.push(ConsumptionSample {
                device_id: update.device_id,
                timestamp: timestamp.clone(),
                watts: update.watts,
            });
        }

        for sensor in sensors.iter_mut().filter(|s| s.kind == SensorKind::Temperature) {
            let heated = devices.iter().any(|d| {
                d.on && d.kind == DeviceKind::Oven
                    && d.position.distance_to(sensor.position) <= self.config.oven_heat_radius
            });
            sensor.value = drift_temperature(sensor, heated, dt);
            report.values.push(record(store, sensor, &timestamp, None));
        }

        for sensor in sensors.iter_mut().filter(|s| s.kind == SensorKind::PowerMeter) {
            let watts = sensor
                .device
                .as_deref()
                .and_then(|id| devices.iter().find(|d| d.id == id))
                .map(|d| d.consumption)
                .unwrap_or(0.0);
            let watts = (watts * 100.0).round() / 100.0;
            sensor.consumption = Some(watts);
            sensor.value = if watts > self.config.meter_threshold_watts { 1.0 } else { 0.0 };
            report.values.push(record(store, sensor, &timestamp, Some(watts)));
        }

        for sensor in sensors.iter_mut().filter(|s| s.kind.is_binary()) {
            sensor.value = sensor.binary_value();
            report.values.push(record(store, sensor, &timestamp, None));
        }

        trace!(
            "refresh #{} at {}: {} devices, {} samples",
            self.refreshes,
            timestamp,
            report.consumption.len(),
            report.values.len()
        );
        report
    }
}

/// Heat toward `max` or cool toward `min` by `step` per second, rounded to 0.5
fn drift_temperature(sensor: &Sensor, heated: bool, dt: f64) -> f64 {
    let change = sensor.step * dt;
    let value = if heated {
        (sensor.value + change).min(sensor.max)
    } else {
        (sensor.value - change).max(sensor.min)
    };
    (value * 2.0).round() / 2.0
}

fn record(store: &mut SensorStore, sensor: &Sensor, timestamp: &str, consumption: Option<f64>) -> SensorValueSample {
    let sample = store.record_metered(&sensor.id, timestamp, sensor.value, consumption);
    SensorValueSample {
        sensor_id: sensor.id.clone(),
        timestamp: sample.timestamp.clone(),
        value: sample.value,
    }
}
