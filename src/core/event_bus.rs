// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Event bus for the records the engine emits

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::ActivityEvent;
use crate::sensors::{ConsumptionSample, SensorValueSample};

/// Event types in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Activity,
    Consumption,
    SensorValue,
    Status,
}

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: EventType,
    /// Wall-clock emission time
    pub emitted_at: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Activity(ActivityEvent),
    Consumption(ConsumptionSample),
    SensorValue(SensorValueSample),
    Status { key: String, value: String },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    activity_tx: broadcast::Sender<ActivityEvent>,
    consumption_tx: broadcast::Sender<ConsumptionSample>,
    value_tx: broadcast::Sender<SensorValueSample>,
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (activity_tx, _) = broadcast::channel(capacity);
        let (consumption_tx, _) = broadcast::channel(capacity);
        let (value_tx, _) = broadcast::channel(capacity);
        let (event_tx, _) = broadcast::channel(capacity);

        Self {
            activity_tx,
            consumption_tx,
            value_tx,
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    pub fn publish_activity(&self, event: ActivityEvent) {
        let _ = self.activity_tx.send(event.clone());
        self.publish_event(EventType::Activity, EventPayload::Activity(event));
    }

    pub fn publish_consumption(&self, sample: ConsumptionSample) {
        let _ = self.consumption_tx.send(sample.clone());
        self.publish_event(EventType::Consumption, EventPayload::Consumption(sample));
    }

    pub fn publish_value(&self, sample: SensorValueSample) {
        let _ = self.value_tx.send(sample.clone());
        self.publish_event(EventType::SensorValue, EventPayload::SensorValue(sample));
    }

    pub fn publish_status(&self, key: &str, value: &str) {
        self.publish_event(
            EventType::Status,
            EventPayload::Status {
                key: key.to_string(),
                value: value.to_string(),
            },
        );
    }

    fn publish_event(&self, event_type: EventType, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            event_type,
            emitted_at: Utc::now(),
            payload,
        };
        let _ = self.event_tx.send(event);
    }

    /// Number of envelopes published so far
    pub fn published(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    pub fn subscribe_activities(&self) -> broadcast::Receiver<ActivityEvent> {
        self.activity_tx.subscribe()
    }

    pub fn subscribe_consumption(&self) -> broadcast::Receiver<ConsumptionSample> {
        self.consumption_tx.subscribe()
    }

    pub fn subscribe_values(&self) -> broadcast::Receiver<SensorValueSample> {
        self.value_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
