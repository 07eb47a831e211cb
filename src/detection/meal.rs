// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Meal detection
//!
//! A meal is someone sitting at the table during a meal window, with motion
//! seen near an oven that is off. Once confirmed, the slot stays confirmed
//! until its window ends: a break in the conditions hides the label but a
//! return to the table shows it again without another debounce.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ActivityLabel, DetectionContext};
use crate::clock::parse_time_of_day;
use crate::config::{MealWindow, MealWindows};
use crate::devices::DeviceKind;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn label(self) -> ActivityLabel {
        match self {
            MealSlot::Breakfast => ActivityLabel::Breakfast,
            MealSlot::Lunch => ActivityLabel::Lunch,
            MealSlot::Dinner => ActivityLabel::Dinner,
        }
    }

    pub fn window(self, windows: &MealWindows) -> MealWindow {
        match self {
            MealSlot::Breakfast => windows.breakfast,
            MealSlot::Lunch => windows.lunch,
            MealSlot::Dinner => windows.dinner,
        }
    }

    /// Slot whose window contains `hour`
    pub fn at_hour(hour: u32, windows: &MealWindows) -> Option<MealSlot> {
        Self::ALL.into_iter().find(|slot| slot.window(windows).contains(hour))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealState {
    /// Elapsed time at which all conditions started holding, per slot
    started: HashMap<MealSlot, Duration>,
    confirmed: Option<MealSlot>,
}

impl MealState {
    pub fn confirmed(&self) -> Option<MealSlot> {
        self.confirmed
    }

    pub fn is_timing(&self, slot: MealSlot) -> bool {
        self.started.contains_key(&slot)
    }

    fn clear(&mut self) {
        self.started.clear();
        self.confirmed = None;
    }
}

fn current_hour(ctx: &DetectionContext<'_>) -> u32 {
    let time = ctx.clock.time_of_day();
    match parse_time_of_day(&time) {
        Ok(t) => t.hour(),
        Err(e) => {
            debug!("{}, meal hour defaults to 0", e);
            0
        }
    }
}

fn conditions_hold(ctx: &DetectionContext<'_>) -> bool {
    let idle_oven_watched = ctx
        .devices
        .iter()
        .filter(|d| d.kind == DeviceKind::Oven && !d.on)
        .any(|oven| {
            ctx.visible_motion_sensor(oven.position)
                .is_some_and(|pir| ctx.is_active(pir))
        });

    idle_oven_watched && ctx.weight_active_near("table", ctx.config.table_radius, true)
}

pub fn detect_meal(ctx: &DetectionContext<'_>, state: &mut MealState) -> Result<Option<ActivityLabel>> {
    let Some(slot) = MealSlot::at_hour(current_hour(ctx), &ctx.config.meal_windows) else {
        state.clear();
        return Ok(None);
    };

    // timers and latches of other slots do not survive into this one
    state.started.retain(|s, _| *s == slot);
    if state.confirmed.is_some_and(|s| s != slot) {
        state.confirmed = None;
    }

    if !conditions_hold(ctx) {
        state.started.remove(&slot);
        return Ok(None);
    }

    if state.confirmed == Some(slot) {
        return Ok(Some(slot.label()));
    }

    let elapsed = ctx.clock.elapsed();
    let since = *state.started.entry(slot).or_insert(elapsed);
    if elapsed.saturating_sub(since) >= Duration::from_secs(ctx.config.meal_min_secs) {
        info!("{} confirmed at {}", slot.label(), ctx.clock.time_of_day());
        state.started.remove(&slot);
        state.confirmed = Some(slot);
        return Ok(Some(slot.label()));
    }

    Ok(None)
}
