// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Device power-consumption model
//!
//! Each device kind owns a profile: a standby draw plus a step function from
//! minutes-since-cycle-start to watts. Profiles are evaluated either once
//! (stepped) or cyclically (repeat, fridge compressor duty cycle).

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Device, DeviceKind};

/// How elapsed time maps onto a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Floor lookup on elapsed minutes
    Stepped,
    /// Elapsed minutes modulo the profile duration, then floor lookup
    Repeat,
}

/// Piecewise-constant draw of one device kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionProfile {
    pub standby: f64,
    /// (minute, watts), ascending by minute
    steps: Vec<(f64, f64)>,
    pub mode: EvaluationMode,
}

impl ConsumptionProfile {
    pub fn new(standby: f64, steps: &[(f64, f64)], mode: EvaluationMode) -> Self {
        let mut steps = steps.to_vec();
        steps.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { standby, steps, mode }
    }

    /// Built-in profile for a device kind
    pub fn for_kind(kind: DeviceKind) -> Self {
        use EvaluationMode::*;
        match kind {
            DeviceKind::Fridge => Self::new(
                23.0,
                &[
                    (0.0, 74.7), (16.0, 70.6), (33.0, 70.6), (49.0, 99.7),
                    (65.0, 99.7), (81.0, 99.7), (98.0, 74.8), (114.0, 24.0),
                    (130.0, 24.0), (146.0, 90.1), (163.0, 90.1), (179.0, 82.9),
                ],
                Repeat,
            ),
            DeviceKind::WashingMachine => Self::new(
                0.0,
                &[
                    (0.0, 3.0), (13.0, 687.6), (26.0, 2094.3), (39.0, 102.9),
                    (52.0, 100.3), (65.0, 108.3), (78.0, 138.7), (91.0, 255.0),
                ],
                Stepped,
            ),
            DeviceKind::Oven => Self::new(
                0.0,
                &[(0.0, 942.8), (3.0, 995.3), (6.0, 916.6), (9.0, 947.7)],
                Stepped,
            ),
            DeviceKind::Computer => Self::new(
                103.5,
                &[
                    (0.0, 90.4), (13.0, 90.9), (26.0, 52.1), (65.0, 73.5),
                    (78.0, 106.5), (101.0, 111.5), (114.0, 108.7), (127.0, 103.2),
                    (150.0, 100.9), (173.0, 102.7), (196.0, 103.8), (205.0, 105.3),
                    (218.0, 104.6), (231.0, 103.1), (245.0, 103.5),
                ],
                Stepped,
            ),
            DeviceKind::Dishwasher => Self::new(
                0.0,
                &[
                    (0.0, 67.1), (13.0, 1716.1), (26.0, 151.2), (39.0, 66.5),
                    (52.0, 1966.7), (65.0, 7.8), (78.0, 4.6),
                ],
                Stepped,
            ),
            DeviceKind::CoffeeMachine => Self::new(
                0.0,
                &[(0.0, 1200.0), (1.0, 700.0), (2.0, 200.0)],
                Stepped,
            ),
        }
    }

    /// Minute of the last step (0 for an empty profile)
    pub fn duration(&self) -> f64 {
        self.steps.last().map(|s| s.0).unwrap_or(0.0)
    }

    /// Draw right after switch-on, before any cycle is recorded
    pub fn initial_watts(&self) -> f64 {
        self.steps.first().map(|s| s.1).unwrap_or(self.standby)
    }

    /// Watts drawn `elapsed_minutes` into the cycle
    pub fn evaluate(&self, elapsed_minutes: f64) -> f64 {
        let Some(&(first_key, first_watts)) = self.steps.first() else {
            return self.standby;
        };

        let duration = self.duration();
        let t = match self.mode {
            EvaluationMode::Repeat if duration > 0.0 => elapsed_minutes.rem_euclid(duration),
            _ => elapsed_minutes,
        };

        if t < first_key {
            return first_watts;
        }
        self.steps
            .iter()
            .take_while(|(key, _)| *key <= t)
            .last()
            .map(|s| s.1)
            .unwrap_or(first_watts)
    }
}

/// A running consumption cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveCycle {
    pub started_at: NaiveDateTime,
    pub kind: DeviceKind,
}

/// Result of refreshing one device
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionUpdate {
    pub device_id: String,
    pub watts: f64,
    /// The device reached the end of its program and was switched off
    pub switched_off: bool,
}

/// Profiles for every kind plus the active-cycle registry
#[derive(Debug, Clone)]
pub struct ConsumptionModel {
    profiles: HashMap<DeviceKind, ConsumptionProfile>,
    cycles: HashMap<String, ActiveCycle>,
}

impl ConsumptionModel {
    pub fn new() -> Self {
        let kinds = [
            DeviceKind::Oven,
            DeviceKind::Fridge,
            DeviceKind::WashingMachine,
            DeviceKind::Dishwasher,
            DeviceKind::Computer,
            DeviceKind::CoffeeMachine,
        ];
        Self {
            profiles: kinds.iter().map(|&k| (k, ConsumptionProfile::for_kind(k))).collect(),
            cycles: HashMap::new(),
        }
    }

    /// Replace the profile used for a kind
    pub fn set_profile(&mut self, kind: DeviceKind, profile: ConsumptionProfile) {
        self.profiles.insert(kind, profile);
    }

    pub fn profile(&self, kind: DeviceKind) -> Option<&ConsumptionProfile> {
        self.profiles.get(&kind)
    }

    pub fn cycle(&self, device_id: &str) -> Option<&ActiveCycle> {
        self.cycles.get(device_id)
    }

    pub fn active_cycles(&self) -> usize {
        self.cycles.len()
    }

    /// Off -> on transition. Continuous kinds keep an existing cycle so their
    /// duty cycle is not restarted by a momentary flip.
    pub fn switch_on(&mut self, device: &mut Device, now: NaiveDateTime) {
        device.on = true;
        let cycle = ActiveCycle { started_at: now, kind: device.kind };
        if device.kind.is_continuous() {
            self.cycles.entry(device.id.clone()).or_insert(cycle);
        } else {
            self.cycles.insert(device.id.clone(), cycle);
        }
        device.consumption = self.watts(device, now);
        debug!("{} switched on at {}", device.id, now);
    }

    /// On -> off transition
    pub fn switch_off(&mut self, device: &mut Device) {
        device.on = false;
        device.consumption = 0.0;
        if !device.kind.is_continuous() {
            self.cycles.remove(&device.id);
        }
        debug!("{} switched off", device.id);
    }

    /// Flip a device; returns the new on/off state
    pub fn toggle(&mut self, device: &mut Device, now: NaiveDateTime) -> bool {
        if device.on {
            self.switch_off(device);
        } else {
            self.switch_on(device, now);
        }
        device.on
    }

    /// Instantaneous draw, without side effects
    pub fn watts(&self, device: &Device, now: NaiveDateTime) -> f64 {
        if !device.on {
            return 0.0;
        }
        let Some(profile) = self.profiles.get(&device.kind) else {
            return 0.0;
        };
        match self.cycles.get(&device.id) {
            Some(cycle) => profile.evaluate(minutes_between(cycle.started_at, now)),
            None => profile.initial_watts(),
        }
    }

    /// Recompute every device's draw at `now`, switching off one-shot
    /// programs that ran past the end of their profile
    pub fn refresh(&mut self, devices: &mut [Device], now: NaiveDateTime) -> Vec<ConsumptionUpdate> {
        let mut updates = Vec::with_capacity(devices.len());

        for device in devices.iter_mut() {
            let mut switched_off = false;

            if !device.on {
                self.switch_off(device);
            } else if let Some(cycle) = self.cycles.get(&device.id).copied() {
                let elapsed = minutes_between(cycle.started_at, now);
                let duration = self.profiles.get(&cycle.kind).map(|p| p.duration()).unwrap_or(0.0);

                if elapsed > duration && !cycle.kind.is_continuous() {
                    info!("{} finished its {} program after {:.0} min", device.id, cycle.kind, elapsed);
                    self.switch_off(device);
                    switched_off = true;
                } else {
                    device.consumption = self.watts(device, now);
                }
            } else {
                device.consumption = self.watts(device, now);
            }

            updates.push(ConsumptionUpdate {
                device_id: device.id.clone(),
                watts: device.consumption,
                switched_off,
            });
        }

        updates
    }

    /// Drop every cycle
    pub fn reset(&mut self) {
        self.cycles.clear();
    }
}

impl Default for ConsumptionModel {
    fn default() -> Self {
        Self::new()
    }
}

fn minutes_between(start: NaiveDateTime, now: NaiveDateTime) -> f64 {
    (now - start).num_milliseconds() as f64 / 60_000.0
}
