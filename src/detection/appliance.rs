// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Level-triggered appliance activities: cooking, laundry, dishwashing, office work

use super::{ActivityLabel, DetectionContext};
use crate::devices::DeviceKind;
use crate::error::{Result, SimError};
use crate::sensors::SensorKind;

/// A running oven watched by an active motion sensor
pub fn detect_cooking(ctx: &DetectionContext<'_>) -> Result<Option<ActivityLabel>> {
    let cooking = ctx
        .devices
        .iter()
        .filter(|d| d.kind == DeviceKind::Oven && d.on)
        .any(|oven| {
            ctx.visible_motion_sensor(oven.position)
                .is_some_and(|pir| ctx.is_active(pir))
        });
    Ok(cooking.then_some(ActivityLabel::Cooking))
}

/// A power meter bound to a `kind` device reports a non-zero value.
///
/// A meter bound to a device that does not exist is an error, unless another
/// meter already confirms the activity.
fn metered(ctx: &DetectionContext<'_>, kind: DeviceKind, label: ActivityLabel) -> Result<Option<ActivityLabel>> {
    let mut dangling = None;

    for meter in ctx.sensors_of(SensorKind::PowerMeter) {
        let Some(device_id) = meter.device.as_deref() else {
            continue;
        };
        let Some(device) = ctx.devices.iter().find(|d| d.id == device_id) else {
            dangling.get_or_insert_with(|| SimError::UnknownDevice {
                sensor: meter.id.clone(),
                device: device_id.to_string(),
            });
            continue;
        };
        if device.kind == kind && ctx.store.last_value(&meter.id) > 0.0 {
            return Ok(Some(label));
        }
    }

    match dangling {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

pub fn detect_laundry(ctx: &DetectionContext<'_>) -> Result<Option<ActivityLabel>> {
    metered(ctx, DeviceKind::WashingMachine, ActivityLabel::Laundry)
}

pub fn detect_dishwasher(ctx: &DetectionContext<'_>) -> Result<Option<ActivityLabel>> {
    metered(ctx, DeviceKind::Dishwasher, ActivityLabel::Dishwasher)
}

pub fn detect_office(ctx: &DetectionContext<'_>) -> Result<Option<ActivityLabel>> {
    metered(ctx, DeviceKind::Computer, ActivityLabel::Office)
}
