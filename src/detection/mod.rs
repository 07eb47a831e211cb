//! Detection module - debounced activity detectors
//!
//! Eight detectors run on every tick against the refreshed snapshot. Each one
//! owns a slice of [`DetectorTimerState`]; the [`DetectionEngine`] threads that
//! state through and isolates failures so one broken detector never stops the
//! others.

mod appliance;
mod meal;
mod presence;
mod rest;

pub use appliance::{detect_cooking, detect_dishwasher, detect_laundry, detect_office};
pub use meal::{detect_meal, MealSlot, MealState};
pub use presence::{detect_exit, detect_return, PresenceState};
pub use rest::{detect_sleep, SleepState};

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::SimClock;
use crate::config::DetectionConfig;
use crate::devices::Device;
use crate::error::{Result, SimError};
use crate::geometry::{closest_in_fov_with_line_of_sight, Layout, Point};
use crate::sensors::{Sensor, SensorKind, SensorStore};

/// Activities the engine can infer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLabel {
    LeavingHome,
    ReturningHome,
    Sleeping,
    Cooking,
    Breakfast,
    Lunch,
    Dinner,
    Laundry,
    Dishwasher,
    Office,
}

impl fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityLabel::LeavingHome => "leaving home",
            ActivityLabel::ReturningHome => "returning home",
            ActivityLabel::Sleeping => "sleeping",
            ActivityLabel::Cooking => "cooking",
            ActivityLabel::Breakfast => "breakfast",
            ActivityLabel::Lunch => "lunch",
            ActivityLabel::Dinner => "dinner",
            ActivityLabel::Laundry => "laundry",
            ActivityLabel::Dishwasher => "dishwasher",
            ActivityLabel::Office => "office",
        };
        f.write_str(name)
    }
}

/// Read-only snapshot handed to every detector
pub struct DetectionContext<'a> {
    pub sensors: &'a [Sensor],
    pub devices: &'a [Device],
    pub layout: &'a Layout,
    pub store: &'a SensorStore,
    pub clock: &'a dyn SimClock,
    pub config: &'a DetectionConfig,
}

impl<'a> DetectionContext<'a> {
    pub fn sensors_of(&self, kind: SensorKind) -> impl Iterator<Item = &'a Sensor> + 'a {
        self.sensors.iter().filter(move |s| s.kind == kind)
    }

    pub fn motion_sensors(&self) -> impl Iterator<Item = &'a Sensor> + 'a {
        self.sensors_of(SensorKind::Motion)
    }

    /// Last recorded value is 1
    pub fn is_active(&self, sensor: &Sensor) -> bool {
        self.store.is_active(&sensor.id)
    }

    /// Nearest motion sensor that sees `point` through open doors
    pub fn visible_motion_sensor(&self, point: Point) -> Option<&'a Sensor> {
        closest_in_fov_with_line_of_sight(
            point,
            self.motion_sensors(),
            &self.layout.walls,
            &self.layout.doors,
            self.config.fov_radius,
            self.config.fov_angle,
        )
    }

    /// The contact switch on the entrance door
    pub fn entry_switch(&self) -> Option<&'a Sensor> {
        let name = self.config.entry_switch.as_str();
        self.sensors_of(SensorKind::Switch)
            .find(|s| s.id.eq_ignore_ascii_case(name))
    }

    /// Weight sensors reading 1 within `radius` of any point named `prefix`
    pub fn weight_active_near(&self, prefix: &str, radius: f64, inclusive: bool) -> bool {
        self.layout.points_named(prefix).any(|point| {
            self.sensors_of(SensorKind::Weight).any(|s| {
                let d = s.position.distance_to(point.position);
                let within = if inclusive { d <= radius } else { d < radius };
                within && self.is_active(s)
            })
        })
    }
}

/// Timers and latches of every stateful detector.
///
/// Created fresh per simulation run and dropped on stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorTimerState {
    pub presence: PresenceState,
    pub sleep: SleepState,
    pub meal: MealState,
}

type Detector = fn(&DetectionContext<'_>, &mut DetectorTimerState) -> Result<Option<ActivityLabel>>;

/// Run `detect` on one slice of timer state, restoring the slice if it fails
fn isolated<S, F>(slice: &mut S, detect: F) -> Result<Option<ActivityLabel>>
where
    S: Clone,
    F: FnOnce(&mut S) -> Result<Option<ActivityLabel>>,
{
    let snapshot = slice.clone();
    detect(slice).inspect_err(|_| *slice = snapshot)
}

fn detectors() -> [(&'static str, Detector); 8] {
    [
        ("exit", |ctx, state| isolated(&mut state.presence, |p| detect_exit(ctx, p))),
        ("return", |ctx, state| isolated(&mut state.presence, |p| detect_return(ctx, p))),
        ("sleep", |ctx, state| isolated(&mut state.sleep, |s| detect_sleep(ctx, s))),
        ("cooking", |ctx, _| detect_cooking(ctx)),
        ("meal", |ctx, state| isolated(&mut state.meal, |m| detect_meal(ctx, m))),
        ("laundry", |ctx, _| detect_laundry(ctx)),
        ("dishwasher", |ctx, _| detect_dishwasher(ctx)),
        ("office", |ctx, _| detect_office(ctx)),
    ]
}

/// Runs the detector bank once per tick
#[derive(Debug, Default)]
pub struct DetectionEngine {
    state: DetectorTimerState,
    last_errors: HashMap<&'static str, SimError>,
    failures: u64,
}

impl DetectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every detector and collect the labels that fired.
    ///
    /// A detector that fails has its own slice of timer state rolled back and
    /// counts as absent for this tick.
    pub fn run(&mut self, ctx: &DetectionContext<'_>) -> BTreeSet<ActivityLabel> {
        let mut labels = BTreeSet::new();

        for (name, detect) in detectors() {
            match detect(ctx, &mut self.state) {
                Ok(Some(label)) => {
                    labels.insert(label);
                    self.last_errors.remove(name);
                }
                Ok(None) => {
                    self.last_errors.remove(name);
                }
                Err(e) => {
                    self.failures += 1;
                    if self.last_errors.get(name) != Some(&e) {
                        warn!("{} detector failed: {}", name, e);
                    } else {
                        debug!("{} detector still failing: {}", name, e);
                    }
                    self.last_errors.insert(name, e);
                }
            }
        }

        labels
    }

    pub fn state(&self) -> &DetectorTimerState {
        &self.state
    }

    /// Total detector failures since the last reset
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Discard all timers and latches
    pub fn reset(&mut self) {
        self.state = DetectorTimerState::default();
        self.last_errors.clear();
        self.failures = 0;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Home;
    use super::*;
    use crate::devices::DeviceKind;

    #[test]
    fn test_label_display() {
        assert_eq!(ActivityLabel::LeavingHome.to_string(), "leaving home");
        assert_eq!(ActivityLabel::Office.to_string(), "office");
        assert_eq!(serde_json::to_string(&ActivityLabel::ReturningHome).unwrap(), "\"returning_home\"");
    }

    #[test]
    fn test_engine_collects_independent_labels() {
        let mut home = Home::new("13:00")
            .with_sensor(Sensor::new("m_wash", SensorKind::PowerMeter, Point::default()).with_device("washer"))
            .with_sensor(Sensor::new("m_pc", SensorKind::PowerMeter, Point::default()).with_device("pc"))
            .with_device(Device::new("washer", DeviceKind::WashingMachine, Point::default()))
            .with_device(Device::new("pc", DeviceKind::Computer, Point::default()));
        home.set("m_wash", 1.0);
        home.set("m_pc", 1.0);

        let mut engine = DetectionEngine::new();
        let labels = engine.run(&home.context());
        assert_eq!(
            labels.into_iter().collect::<Vec<_>>(),
            vec![ActivityLabel::Laundry, ActivityLabel::Office]
        );
        assert_eq!(engine.failures(), 0);
    }

    #[test]
    fn test_failing_detector_is_isolated() {
        let mut home = Home::new("13:00")
            .with_sensor(Sensor::new("m_ghost", SensorKind::PowerMeter, Point::default()).with_device("missing"))
            .with_sensor(Sensor::new("m_pc", SensorKind::PowerMeter, Point::default()).with_device("pc"))
            .with_device(Device::new("pc", DeviceKind::Computer, Point::default()));
        home.set("m_ghost", 1.0);
        home.set("m_pc", 1.0);

        let mut engine = DetectionEngine::new();
        let labels = engine.run(&home.context());
        // the dangling meter breaks laundry and dishwasher, office still fires
        assert!(labels.contains(&ActivityLabel::Office));
        assert!(!labels.contains(&ActivityLabel::Laundry));
        assert_eq!(engine.failures(), 2);

        engine.reset();
        assert_eq!(engine.failures(), 0);
        assert_eq!(engine.state(), &DetectorTimerState::default());
    }

    #[test]
    fn test_isolated_restores_slice_on_error() {
        let mut timers = vec![1u64, 2];
        let result = isolated(&mut timers, |t| {
            t.clear();
            t.push(99);
            Err(SimError::NotRunning)
        });
        assert_eq!(result, Err(SimError::NotRunning));
        assert_eq!(timers, vec![1, 2]);

        let result = isolated(&mut timers, |t| {
            t.push(3);
            Ok(None)
        });
        assert_eq!(result, Ok(None));
        assert_eq!(timers, vec![1, 2, 3]);
    }

    #[test]
    fn test_failures_leave_presence_latch_alone() {
        let mut home = Home::new("13:00")
            .with_sensor(Sensor::new("entrance", SensorKind::Switch, Point::default()))
            .with_sensor(Sensor::new("m_ghost", SensorKind::PowerMeter, Point::default()).with_device("missing"));
        home.set("m_ghost", 1.0);
        home.set("entrance", 1.0);
        home.set("entrance", 0.0);

        let mut engine = DetectionEngine::new();
        engine.run(&home.context());
        assert!(engine.state().presence.exit_pending());

        home.wait(5);
        let labels = engine.run(&home.context());
        assert!(labels.contains(&ActivityLabel::LeavingHome));
        assert!(engine.state().presence.is_away());
        // laundry, dishwasher and office fail on both ticks
        assert_eq!(engine.failures(), 6);
    }

    #[test]
    fn test_entry_switch_lookup_ignores_case() {
        let home = Home::new("08:00")
            .with_sensor(Sensor::new("Entrance", SensorKind::Switch, Point::default()))
            .with_sensor(Sensor::new("entrance", SensorKind::Motion, Point::default()));
        let ctx = home.context();
        assert_eq!(ctx.entry_switch().map(|s| s.kind), Some(SensorKind::Switch));
    }
}
