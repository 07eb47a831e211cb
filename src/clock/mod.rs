// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Simulated clock
//!
//! Detectors never look at wall-clock time. They read `elapsed()`, which only
//! moves when the scheduler ticks the clock or the user fast-forwards it, so
//! pausing or advancing yields the same detector behavior as real-time
//! progression over the same simulated span.
//!
//! Each elapsed second maps to `minutes_per_second` simulated minutes of
//! time-of-day (one minute by default).

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Format of sample and session timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Read-only view of simulated time consumed by the core
pub trait SimClock {
    /// Monotonic elapsed simulation time since start
    fn elapsed(&self) -> Duration;

    /// Current simulated date and time
    fn now(&self) -> NaiveDateTime;

    fn is_running(&self) -> bool;

    /// Time of day as "HH:MM"
    fn time_of_day(&self) -> String {
        self.now().format("%H:%M").to_string()
    }

    /// Full timestamp as "YYYY-MM-DD HH:MM"
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Parse an "HH:MM" string
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| SimError::InvalidTime { value: value.to_string() })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStatus {
    Idle,
    Running,
    Paused,
}

/// Simulated clock driven by explicit ticks
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    status: ClockStatus,
    start: NaiveDateTime,
    elapsed: Duration,
    minutes_per_second: u32,
}

impl SimulatedClock {
    pub fn new(minutes_per_second: u32) -> Self {
        Self {
            status: ClockStatus::Idle,
            start: NaiveDateTime::default(),
            elapsed: Duration::ZERO,
            minutes_per_second: minutes_per_second.max(1),
        }
    }

    /// Start from `start_time` ("HH:MM") on `date`, resetting elapsed time
    pub fn start(&mut self, start_time: &str, date: NaiveDate) -> Result<()> {
        let time = parse_time_of_day(start_time)?;
        self.start = NaiveDateTime::new(date, time);
        self.elapsed = Duration::ZERO;
        self.status = ClockStatus::Running;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.status == ClockStatus::Running {
            self.status = ClockStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == ClockStatus::Paused {
            self.status = ClockStatus::Running;
        }
    }

    /// Scheduler tick; ignored unless running
    pub fn tick(&mut self, delta: Duration) {
        if self.status == ClockStatus::Running {
            self.elapsed += delta;
        }
    }

    /// Fast-forward, whether running or paused
    pub fn advance(&mut self, delta: Duration) {
        if self.status != ClockStatus::Idle {
            self.elapsed += delta;
        }
    }

    pub fn reset(&mut self) {
        self.status = ClockStatus::Idle;
        self.elapsed = Duration::ZERO;
    }

    pub fn status(&self) -> ClockStatus {
        self.status
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SimClock for SimulatedClock {
    fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn now(&self) -> NaiveDateTime {
        let simulated_secs = self.elapsed.as_secs_f64() * 60.0 * self.minutes_per_second as f64;
        let offset = TimeDelta::milliseconds((simulated_secs * 1000.0) as i64);
        self.start + offset
    }

    fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }
}
