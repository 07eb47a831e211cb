// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Activity session tracker
//!
//! Turns the per-tick set of active labels into bracketed sessions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::detection::ActivityLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventKind {
    Start,
    End,
}

/// Start or end of an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub label: ActivityLabel,
    pub kind: ActivityEventKind,
    pub timestamp: String,
}

/// One continuous interval of an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySession {
    pub id: Uuid,
    pub label: ActivityLabel,
    pub start: String,
    /// None while the session is open
    pub end: Option<String>,
}

#[derive(Debug, Default)]
pub struct ActivityTracker {
    open: BTreeMap<ActivityLabel, ActivitySession>,
    closed: Vec<ActivitySession>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open sessions for new labels and close sessions for vanished ones
    pub fn reconcile(&mut self, now: &str, active: &BTreeSet<ActivityLabel>) -> Vec<ActivityEvent> {
        let mut events = Vec::new();

        for &label in active {
            if self.open.contains_key(&label) {
                continue;
            }
            info!("Activity started: {} at {}", label, now);
            self.open.insert(
                label,
                ActivitySession {
                    id: Uuid::new_v4(),
                    label,
                    start: now.to_string(),
                    end: None,
                },
            );
            events.push(ActivityEvent {
                label,
                kind: ActivityEventKind::Start,
                timestamp: now.to_string(),
            });
        }

        let ended: Vec<ActivityLabel> = self
            .open
            .keys()
            .filter(|label| !active.contains(label))
            .copied()
            .collect();
        for label in ended {
            events.extend(self.close(label, now));
        }

        events
    }

    /// Close every open session at `now`
    pub fn close_all(&mut self, now: &str) -> Vec<ActivityEvent> {
        let labels: Vec<ActivityLabel> = self.open.keys().copied().collect();
        labels
            .into_iter()
            .filter_map(|label| self.close(label, now))
            .collect()
    }

    fn close(&mut self, label: ActivityLabel, now: &str) -> Option<ActivityEvent> {
        let mut session = self.open.remove(&label)?;
        info!("Activity ended: {} at {} (started {})", label, now, session.start);
        session.end = Some(now.to_string());
        self.closed.push(session);
        Some(ActivityEvent {
            label,
            kind: ActivityEventKind::End,
            timestamp: now.to_string(),
        })
    }

    pub fn open_labels(&self) -> impl Iterator<Item = ActivityLabel> + '_ {
        self.open.keys().copied()
    }

    pub fn open_sessions(&self) -> impl Iterator<Item = &ActivitySession> {
        self.open.values()
    }

    /// Closed sessions in closing order
    pub fn sessions(&self) -> &[ActivitySession] {
        &self.closed
    }

    pub fn reset(&mut self) {
        self.open.clear();
        self.closed.clear();
    }
}
