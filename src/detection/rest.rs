// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Sleep detection from bed weight sensors

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use super::{ActivityLabel, DetectionContext};
use crate::error::Result;
use crate::sensors::SensorKind;

/// Per-sensor occupancy timers, keyed by weight sensor id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepState {
    occupied_since: HashMap<String, Duration>,
}

impl SleepState {
    pub fn is_timing(&self, sensor_id: &str) -> bool {
        self.occupied_since.contains_key(sensor_id)
    }
}

pub fn detect_sleep(ctx: &DetectionContext<'_>, state: &mut SleepState) -> Result<Option<ActivityLabel>> {
    let elapsed = ctx.clock.elapsed();
    let min = Duration::from_secs(ctx.config.sleep_min_secs);
    let radius = ctx.config.bed_radius;
    let mut sleeping = false;

    let near_bed = ctx.sensors_of(SensorKind::Weight).filter(|s| {
        ctx.layout
            .points_named("bed")
            .any(|bed| bed.position.distance_to(s.position) < radius)
    });

    for sensor in near_bed {
        if ctx.is_active(sensor) {
            let since = *state.occupied_since.entry(sensor.id.clone()).or_insert(elapsed);
            if elapsed.saturating_sub(since) >= min {
                sleeping = true;
            }
        } else if state.occupied_since.remove(&sensor.id).is_some() {
            debug!("{} released, sleep timer reset", sensor.id);
        }
    }

    Ok(sleeping.then_some(ActivityLabel::Sleeping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::testing::Home;
    use crate::geometry::Point;
    use crate::sensors::Sensor;

    fn bedroom() -> Home {
        Home::new("23:00")
            .with_point("Bed1", Point::new(100.0, 100.0))
            .with_sensor(Sensor::new("bed_w", SensorKind::Weight, Point::new(110.0, 100.0)))
            .with_sensor(Sensor::new("chair_w", SensorKind::Weight, Point::new(160.0, 100.0)))
    }

    fn detect(home: &Home, state: &mut SleepState) -> Option<ActivityLabel> {
        detect_sleep(&home.context(), state).unwrap()
    }

    #[test]
    fn test_sleep_after_sustained_occupancy() {
        let mut home = bedroom();
        let mut state = SleepState::default();

        home.set("bed_w", 1.0);
        assert_eq!(detect(&home, &mut state), None);
        home.wait(9);
        assert_eq!(detect(&home, &mut state), None);
        home.wait(1);
        assert_eq!(detect(&home, &mut state), Some(ActivityLabel::Sleeping));
    }

    #[test]
    fn test_deactivation_resets_timer() {
        let mut home = bedroom();
        let mut state = SleepState::default();

        home.set("bed_w", 1.0);
        detect(&home, &mut state);
        home.wait(8);
        home.set("bed_w", 0.0);
        detect(&home, &mut state);
        assert!(!state.is_timing("bed_w"));

        home.wait(1);
        home.set("bed_w", 1.0);
        detect(&home, &mut state);
        home.wait(9);
        assert_eq!(detect(&home, &mut state), None);
        home.wait(1);
        assert_eq!(detect(&home, &mut state), Some(ActivityLabel::Sleeping));
    }

    #[test]
    fn test_sensor_away_from_bed_ignored() {
        let mut home = bedroom();
        let mut state = SleepState::default();

        home.set("chair_w", 1.0);
        detect(&home, &mut state);
        home.wait(60);
        assert_eq!(detect(&home, &mut state), None);
        assert!(!state.is_timing("chair_w"));
    }

    #[test]
    fn test_no_bed_never_sleeps() {
        let mut home = Home::new("23:00")
            .with_sensor(Sensor::new("bed_w", SensorKind::Weight, Point::new(110.0, 100.0)));
        let mut state = SleepState::default();

        home.set("bed_w", 1.0);
        detect(&home, &mut state);
        home.wait(60);
        assert_eq!(detect(&home, &mut state), None);
    }
}
