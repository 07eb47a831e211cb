// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Append-only per-sensor sample history

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// One recorded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Simulated timestamp, non-decreasing per sensor
    pub timestamp: String,
    pub value: f64,
    /// Metered watts (PowerMeter samples only)
    pub consumption: Option<f64>,
}

/// Ordered sample history of one sensor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorHistory {
    samples: Vec<Sample>,
}

impl SensorHistory {
    /// Append a sample. A sample carrying the same timestamp and value as
    /// the last one overwrites it; a changed value at the same timestamp is
    /// appended so the edge survives. Returns true if a new entry was added.
    pub fn record(&mut self, timestamp: &str, value: f64, consumption: Option<f64>) -> bool {
        if let Some(last) = self.samples.last_mut() {
            if last.timestamp == timestamp && last.value == value {
                last.consumption = consumption.or(last.consumption);
                return false;
            }
        }
        self.samples.push(Sample {
            timestamp: timestamp.to_string(),
            value,
            consumption,
        });
        true
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.samples.last().map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Sample histories for every sensor, keyed by sensor id
#[derive(Debug, Clone, Default)]
pub struct SensorStore {
    histories: HashMap<String, SensorHistory>,
}

impl SensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; returns the stored sample
    pub fn record(&mut self, sensor_id: &str, timestamp: &str, value: f64) -> &Sample {
        self.record_metered(sensor_id, timestamp, value, None)
    }

    pub fn record_metered(
        &mut self,
        sensor_id: &str,
        timestamp: &str,
        value: f64,
        consumption: Option<f64>,
    ) -> &Sample {
        let history = self.histories.entry(sensor_id.to_string()).or_default();
        let appended = history.record(timestamp, value, consumption);
        trace!("{} @ {} -> {} ({})", sensor_id, timestamp, value, if appended { "append" } else { "overwrite" });
        // record() always leaves at least one sample behind
        &history.samples[history.samples.len() - 1]
    }

    pub fn history(&self, sensor_id: &str) -> Option<&SensorHistory> {
        self.histories.get(sensor_id)
    }

    /// Last recorded value, 0 for sensors never sampled
    pub fn last_value(&self, sensor_id: &str) -> f64 {
        self.histories
            .get(sensor_id)
            .and_then(SensorHistory::last_value)
            .unwrap_or(0.0)
    }

    pub fn is_active(&self, sensor_id: &str) -> bool {
        self.last_value(sensor_id) == 1.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SensorHistory)> {
        self.histories.iter()
    }

    pub fn sample_count(&self) -> usize {
        self.histories.values().map(SensorHistory::len).sum()
    }

    pub fn clear(&mut self) {
        self.histories.clear();
    }
}

/// Incremental falling-edge (1 -> 0) detector over a growing history.
///
/// Keeps only the number of samples already consumed and the last value
/// seen, so each call inspects new samples only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeCursor {
    consumed: usize,
    last_value: Option<f64>,
}

impl EdgeCursor {
    /// Consume new samples; returns the index of the latest falling edge
    /// among them, if any
    pub fn advance(&mut self, samples: &[Sample]) -> Option<usize> {
        if samples.len() < self.consumed {
            // history was cleared underneath us
            *self = Self::default();
        }

        let mut edge = None;
        for (i, sample) in samples.iter().enumerate().skip(self.consumed) {
            if self.last_value == Some(1.0) && sample.value == 0.0 {
                edge = Some(i);
            }
            self.last_value = Some(sample.value);
        }
        self.consumed = samples.len();
        edge
    }

    /// Mark everything recorded so far as consumed
    pub fn skip_to_end(&mut self, samples: &[Sample]) {
        self.consumed = samples.len();
        self.last_value = samples.last().map(|s| s.value);
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}
