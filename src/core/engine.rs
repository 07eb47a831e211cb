//! Simulation engine - owns the home and drives one tick at a time

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::{ActivityEvent, ActivityTracker, EventBus, SimulationState};
use crate::clock::{ClockStatus, SimClock, SimulatedClock};
use crate::config::Config;
use crate::detection::{ActivityLabel, DetectionContext, DetectionEngine, DetectorTimerState};
use crate::devices::{ConsumptionModel, Device};
use crate::error::{Result, SimError};
use crate::geometry::{closest_in_fov_with_line_of_sight, closest_unobstructed, DoorState, Layout, Point};
use crate::scenario::Home;
use crate::sensors::{Sensor, SensorKind, SensorSimulator, SensorStore};

/// What an occupant move changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interaction {
    /// Motion sensor that picked the occupant up
    pub motion: Option<String>,
    /// Devices flipped by the move
    pub toggled_devices: Vec<String>,
    /// Weight sensors now pressed
    pub pressed: Vec<String>,
    /// Door flipped by the move
    pub door: Option<usize>,
}

/// Main simulation engine
pub struct Engine {
    pub config: Arc<Config>,
    sensors: Vec<Sensor>,
    devices: Vec<Device>,
    layout: Layout,
    store: SensorStore,
    consumption: ConsumptionModel,
    simulator: SensorSimulator,
    detection: DetectionEngine,
    tracker: ActivityTracker,
    clock: SimulatedClock,
    event_bus: Arc<EventBus>,
    state: SimulationState,
    start_time: Option<Instant>,
}

impl Engine {
    pub fn new(config: Config, home: Home) -> Self {
        let config = Arc::new(config);
        let state = SimulationState {
            sensors: home.sensors.len(),
            devices: home.devices.len(),
            ..SimulationState::default()
        };

        Self {
            sensors: home.sensors,
            devices: home.devices,
            layout: home.layout,
            store: SensorStore::new(),
            consumption: ConsumptionModel::new(),
            simulator: SensorSimulator::new(config.environment.clone()),
            detection: DetectionEngine::new(),
            tracker: ActivityTracker::new(),
            clock: SimulatedClock::new(config.simulation.minutes_per_second),
            event_bus: Arc::new(EventBus::default()),
            state,
            start_time: None,
            config,
        }
    }

    /// Start (or restart) the simulation at `start_time` ("HH:MM") today
    pub fn start(&mut self, start_time: &str) -> Result<()> {
        self.start_on(start_time, Utc::now().date_naive())
    }

    /// Start (or restart) the simulation at `start_time` on `date`
    pub fn start_on(&mut self, start_time: &str, date: NaiveDate) -> Result<()> {
        if self.sensors.is_empty() {
            warn!("Refusing to start: no sensors configured");
            return Err(SimError::NoSensors);
        }
        if self.clock.status() != ClockStatus::Idle {
            self.stop()?;
        }

        self.clock.start(start_time, date)?;
        info!("Starting simulation at {}", self.clock.timestamp());

        self.store.clear();
        self.tracker.reset();
        self.detection.reset();
        self.simulator.reset();
        self.consumption.reset();

        let now = self.clock.now();
        for device in self.devices.iter_mut().filter(|d| d.on) {
            self.consumption.switch_on(device, now);
        }

        self.start_time = Some(Instant::now());
        self.state = SimulationState {
            running: true,
            sensors: self.sensors.len(),
            devices: self.devices.len(),
            simulated_time: Some(self.clock.timestamp()),
            ..SimulationState::default()
        };
        self.event_bus.publish_status("simulation", "started");
        Ok(())
    }

    /// One simulated second: refresh, detect, reconcile.
    ///
    /// A no-op while paused.
    pub fn tick(&mut self) -> Result<Vec<ActivityEvent>> {
        match self.clock.status() {
            ClockStatus::Idle => return Err(SimError::NotRunning),
            ClockStatus::Paused => return Ok(Vec::new()),
            ClockStatus::Running => {}
        }

        let report = self.simulator.refresh(
            &mut self.sensors,
            &mut self.devices,
            &mut self.consumption,
            &mut self.store,
            &self.clock,
        );
        for sample in report.consumption {
            self.event_bus.publish_consumption(sample);
        }
        for sample in report.values {
            self.event_bus.publish_value(sample);
        }

        let ctx = DetectionContext {
            sensors: &self.sensors,
            devices: &self.devices,
            layout: &self.layout,
            store: &self.store,
            clock: &self.clock,
            config: &self.config.detection,
        };
        let labels = self.detection.run(&ctx);

        let timestamp = self.clock.timestamp();
        let events = self.tracker.reconcile(&timestamp, &labels);
        for event in &events {
            self.event_bus.publish_activity(event.clone());
        }

        self.state.ticks += 1;
        self.state.samples = self.store.sample_count();
        self.state.open_sessions = self.tracker.open_labels().count();
        self.state.closed_sessions = self.tracker.sessions().len();
        self.state.detector_failures = self.detection.failures();
        self.state.simulated_time = Some(timestamp);
        if !events.is_empty() {
            self.state.last_activity = self.state.simulated_time.clone();
        }

        Ok(events)
    }

    /// Advance the clock by `delta` and tick
    pub fn step(&mut self, delta: Duration) -> Result<Vec<ActivityEvent>> {
        self.clock.tick(delta);
        self.tick()
    }

    /// Fast-forward the clock; detectors see the jump on the next tick
    pub fn advance(&mut self, delta: Duration) -> Result<()> {
        self.ensure_started()?;
        self.clock.advance(delta);
        info!("Advanced {:?} to {}", delta, self.clock.timestamp());
        Ok(())
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.state.paused = self.clock.status() == ClockStatus::Paused;
    }

    pub fn resume(&mut self) {
        self.clock.resume();
        self.state.paused = self.clock.status() == ClockStatus::Paused;
    }

    /// Close every open session, drop detector state and stop the clock
    pub fn stop(&mut self) -> Result<Vec<ActivityEvent>> {
        self.ensure_started()?;
        let timestamp = self.clock.timestamp();
        info!("Stopping simulation at {}", timestamp);

        let events = self.tracker.close_all(&timestamp);
        for event in &events {
            self.event_bus.publish_activity(event.clone());
        }

        self.detection.reset();
        self.simulator.reset();
        self.clock.reset();

        self.state.running = false;
        self.state.paused = false;
        self.state.open_sessions = 0;
        self.state.closed_sessions = self.tracker.sessions().len();
        self.state.simulated_time = Some(timestamp);
        self.event_bus.publish_status("simulation", "stopped");
        Ok(events)
    }

    pub fn state(&self) -> SimulationState {
        let mut state = self.state.clone();
        state.uptime_seconds = self.uptime();
        state
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    fn ensure_started(&self) -> Result<()> {
        match self.clock.status() {
            ClockStatus::Idle => Err(SimError::NotRunning),
            _ => Ok(()),
        }
    }

    /// Move the occupant to `point` and apply what they trigger there
    pub fn move_occupant(&mut self, point: Point) -> Result<Interaction> {
        self.ensure_started()?;
        let timestamp = self.clock.timestamp();
        let now = self.clock.now();
        let interaction = &self.config.interaction;
        let mut outcome = Interaction::default();

        outcome.motion = closest_in_fov_with_line_of_sight(
            point,
            self.sensors.iter().filter(|s| s.kind == SensorKind::Motion),
            &self.layout.walls,
            &self.layout.doors,
            interaction.motion_range,
            interaction.fov_angle,
        )
        .map(|s| s.id.clone());

        let reachable = outcome.motion.is_some()
            || closest_unobstructed(point, self.sensors.iter(), &self.layout.walls).is_some();

        for sensor in self.sensors.iter_mut() {
            let value = match sensor.kind {
                SensorKind::Motion => outcome.motion.as_deref() == Some(sensor.id.as_str()),
                SensorKind::Weight => sensor.position.distance_to(point) <= interaction.weight_radius,
                _ => continue,
            };
            if value && sensor.kind == SensorKind::Weight {
                outcome.pressed.push(sensor.id.clone());
            }
            set_value(&mut self.store, sensor, &timestamp, if value { 1.0 } else { 0.0 });
        }

        // only the first device in reach toggles
        if reachable {
            if let Some(device) = self
                .devices
                .iter_mut()
                .find(|d| d.position.distance_to(point) <= interaction.device_radius)
            {
                let on = self.consumption.toggle(device, now);
                info!("{} switched {}", device.id, if on { "on" } else { "off" });
                outcome.toggled_devices.push(device.id.clone());
            }
        }

        if let Some(index) = self.layout.door_near(point, interaction.door_tolerance) {
            self.layout.toggle_door(index);
            outcome.door = Some(index);
            self.sync_door_switches(&timestamp);
        }

        debug!("occupant at ({:.0}, {:.0}): {:?}", point.x, point.y, outcome);
        Ok(outcome)
    }

    /// Flip a device on or off; returns the new state
    pub fn toggle_device(&mut self, id: &str) -> Result<bool> {
        self.ensure_started()?;
        let now = self.clock.now();
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| SimError::NoSuchDevice { id: id.to_string() })?;
        let on = self.consumption.toggle(device, now);
        info!("{} switched {}", id, if on { "on" } else { "off" });
        Ok(on)
    }

    /// Open or close a door and update the switches mounted on it
    pub fn toggle_door(&mut self, index: usize) -> Result<DoorState> {
        self.ensure_started()?;
        let state = self
            .layout
            .toggle_door(index)
            .ok_or(SimError::UnknownDoor { index })?;
        let timestamp = self.clock.timestamp();
        self.sync_door_switches(&timestamp);
        info!("door {} is now {:?}", index, state);
        Ok(state)
    }

    fn sync_door_switches(&mut self, timestamp: &str) {
        let radius = self.config.interaction.switch_door_radius;
        for door in &self.layout.doors {
            let midpoint = door.segment.midpoint();
            for sensor in self
                .sensors
                .iter_mut()
                .filter(|s| s.kind == SensorKind::Switch && s.position.distance_to(midpoint) <= radius)
            {
                set_value(&mut self.store, sensor, timestamp, door.state.switch_value());
            }
        }
    }

    /// Insert or replace a sensor from its 11-field positional record.
    /// A malformed record leaves the current sensors untouched.
    pub fn apply_sensor_record(&mut self, fields: &[&str]) -> Result<()> {
        let sensor = Sensor::from_record(fields).inspect_err(|e| warn!("Ignoring sensor record: {}", e))?;
        match self.sensors.iter_mut().find(|s| s.id == sensor.id) {
            Some(existing) => *existing = sensor,
            None => self.sensors.push(sensor),
        }
        self.state.sensors = self.sensors.len();
        Ok(())
    }

    /// Insert or replace a device from its 10-field positional record.
    /// A malformed record leaves the current devices untouched.
    pub fn apply_device_record(&mut self, fields: &[&str]) -> Result<()> {
        let mut device = Device::from_record(fields).inspect_err(|e| warn!("Ignoring device record: {}", e))?;

        if self.clock.status() != ClockStatus::Idle {
            let now = self.clock.now();
            if device.on && self.consumption.cycle(&device.id).is_none() {
                self.consumption.switch_on(&mut device, now);
            } else if !device.on {
                self.consumption.switch_off(&mut device);
            }
        }

        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
        self.state.devices = self.devices.len();
        Ok(())
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn store(&self) -> &SensorStore {
        &self.store
    }

    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    pub fn detector_state(&self) -> &DetectorTimerState {
        self.detection.state()
    }

    /// Labels with an open session
    pub fn active_labels(&self) -> Vec<ActivityLabel> {
        self.tracker.open_labels().collect()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }
}

/// Set a sensor value and record it when it changed
fn set_value(store: &mut SensorStore, sensor: &mut Sensor, timestamp: &str, value: f64) {
    if sensor.value != value {
        sensor.value = value;
        store.record(&sensor.id, timestamp, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActivityEventKind;
    use crate::devices::DeviceKind;
    use crate::geometry::{Door, NamedPoint, Segment};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn kitchen() -> Home {
        Home {
            sensors: vec![
                Sensor::new("kitchen_pir", SensorKind::Motion, Point::new(100.0, 0.0)).with_orientation(180.0),
                Sensor::new("oven_temp", SensorKind::Temperature, Point::new(20.0, 0.0)),
                Sensor::new("entrance", SensorKind::Switch, Point::new(300.0, 10.0)),
                Sensor::new("bed_w", SensorKind::Weight, Point::new(500.0, 500.0)),
            ],
            devices: vec![Device::new("oven1", DeviceKind::Oven, Point::new(0.0, 0.0))],
            layout: Layout {
                walls: Vec::new(),
                doors: vec![Door::new(
                    Segment::new(Point::new(300.0, -20.0), Point::new(300.0, 20.0)),
                    DoorState::Closed,
                )],
                points: vec![NamedPoint { name: "bed".to_string(), position: Point::new(500.0, 505.0) }],
            },
        }
    }

    fn started(home: Home, at: &str) -> Engine {
        let mut engine = Engine::new(Config::default(), home);
        engine.start_on(at, date()).unwrap();
        engine
    }

    fn second(engine: &mut Engine) -> Vec<ActivityEvent> {
        engine.step(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_start_refused_without_sensors() {
        let mut engine = Engine::new(Config::default(), Home::default());
        assert_eq!(engine.start_on("08:00", date()), Err(SimError::NoSensors));
        assert!(!engine.state().running);
    }

    #[test]
    fn test_operations_need_a_started_simulation() {
        let mut engine = Engine::new(Config::default(), kitchen());
        assert_eq!(engine.tick(), Err(SimError::NotRunning));
        assert_eq!(engine.toggle_device("oven1"), Err(SimError::NotRunning));
        assert!(engine.stop().is_err());
    }

    #[test]
    fn test_cooking_session_brackets() {
        let mut engine = started(kitchen(), "18:00");
        engine.toggle_device("oven1").unwrap();
        engine.move_occupant(Point::new(50.0, 0.0)).unwrap();

        let events = second(&mut engine);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, ActivityLabel::Cooking);
        assert_eq!(events[0].kind, ActivityEventKind::Start);
        assert_eq!(engine.active_labels(), vec![ActivityLabel::Cooking]);

        // walk out of view
        engine.move_occupant(Point::new(0.0, 400.0)).unwrap();
        let events = second(&mut engine);
        assert_eq!(events[0].kind, ActivityEventKind::End);

        let events = engine.stop().unwrap();
        assert!(events.is_empty());
        assert_eq!(engine.tracker().sessions().len(), 1);
    }

    #[test]
    fn test_stop_closes_open_sessions_and_resets_detectors() {
        let mut home = kitchen();
        home.sensors[3].value = 1.0;
        let mut engine = started(home, "23:00");

        for _ in 0..11 {
            second(&mut engine);
        }
        assert_eq!(engine.active_labels(), vec![ActivityLabel::Sleeping]);

        let events = engine.stop().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActivityEventKind::End);
        assert_eq!(engine.tracker().sessions().len(), 1);
        assert_eq!(engine.detector_state(), &DetectorTimerState::default());
        assert!(!engine.state().running);
    }

    #[test]
    fn test_pause_freezes_detectors_and_advance_skips_ahead() {
        let mut home = kitchen();
        home.sensors[3].value = 1.0;
        let mut engine = started(home, "23:00");
        second(&mut engine);

        engine.pause();
        for _ in 0..20 {
            assert!(second(&mut engine).is_empty());
        }
        assert!(engine.active_labels().is_empty());

        engine.advance(Duration::from_secs(15)).unwrap();
        engine.resume();
        let events = engine.tick().unwrap();
        assert_eq!(events[0].label, ActivityLabel::Sleeping);
    }

    #[test]
    fn test_door_switch_follows_door() {
        let mut engine = started(kitchen(), "08:00");
        assert_eq!(engine.toggle_door(0).unwrap(), DoorState::Open);
        assert!(engine.store().is_active("entrance"));

        let outcome = engine.move_occupant(Point::new(301.0, 0.0)).unwrap();
        assert_eq!(outcome.door, Some(0));
        assert_eq!(engine.store().last_value("entrance"), 0.0);

        assert_eq!(engine.toggle_door(7), Err(SimError::UnknownDoor { index: 7 }));
    }

    #[test]
    fn test_move_toggles_only_first_device_in_reach() {
        let mut home = kitchen();
        home.devices.push(Device::new("kettle", DeviceKind::Oven, Point::new(3.0, 0.0)));
        let mut engine = started(home, "18:00");

        let outcome = engine.move_occupant(Point::new(1.0, 0.0)).unwrap();
        assert_eq!(outcome.toggled_devices, vec!["oven1".to_string()]);
        assert!(engine.devices()[0].on);
        assert!(!engine.devices()[1].on);
    }

    #[test]
    fn test_oven_heats_nearby_temperature_sensor() {
        let mut engine = started(kitchen(), "18:00");
        engine.toggle_device("oven1").unwrap();
        second(&mut engine);
        for _ in 0..4 {
            second(&mut engine);
        }
        let temp = engine.sensors().iter().find(|s| s.id == "oven_temp").map(|s| s.value);
        assert_eq!(temp, Some(20.0));
    }

    #[test]
    fn test_malformed_records_leave_state_unchanged() {
        let mut engine = started(kitchen(), "08:00");
        let before = engine.sensors().to_vec();

        let err = engine.apply_sensor_record(&["kitchen_pir", "1", "2"]).unwrap_err();
        assert!(matches!(err, SimError::MalformedRecord { .. }));
        assert_eq!(engine.sensors(), &before[..]);

        engine
            .apply_device_record(&["washer", "0", "0", "Washing_Machine", "2000", "1", "0", "0", "0", "None"])
            .unwrap();
        assert_eq!(engine.devices().len(), 2);
        let events = second(&mut engine);
        assert!(events.is_empty());
        assert_eq!(engine.devices()[1].consumption, 3.0);
    }

    #[test]
    fn test_restart_discards_previous_run() {
        let mut home = kitchen();
        home.sensors[3].value = 1.0;
        let mut engine = started(home, "23:00");
        for _ in 0..5 {
            second(&mut engine);
        }
        engine.start_on("23:00", date()).unwrap();
        // the bed timer starts over
        for _ in 0..10 {
            second(&mut engine);
        }
        assert!(engine.active_labels().is_empty());
        second(&mut engine);
        assert_eq!(engine.active_labels(), vec![ActivityLabel::Sleeping]);
    }
}
