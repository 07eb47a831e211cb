// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Leaving and returning home
//!
//! Both detectors watch falling edges (door closed) on the entry switch.
//! Exit arms a confirmation window on each new edge and latches "away" if no
//! motion sensor is active when the window expires. Return only listens while
//! away: an edge opens a second window, and any motion inside it clears the
//! latch.

use std::time::Duration;

use tracing::{debug, info};

use super::{ActivityLabel, DetectionContext};
use crate::error::Result;
use crate::sensors::{EdgeCursor, Sample};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceState {
    exit_edges: EdgeCursor,
    return_edges: EdgeCursor,
    /// Elapsed time at which the exit window was armed
    pending_exit: Option<Duration>,
    /// Elapsed time at which the return window was opened
    pending_return: Option<Duration>,
    away: bool,
}

impl PresenceState {
    pub fn is_away(&self) -> bool {
        self.away
    }

    pub fn exit_pending(&self) -> bool {
        self.pending_exit.is_some()
    }

    pub fn return_pending(&self) -> bool {
        self.pending_return.is_some()
    }
}

fn entry_samples<'a>(ctx: &DetectionContext<'a>) -> &'a [Sample] {
    ctx.entry_switch()
        .and_then(|s| ctx.store.history(&s.id))
        .map(|h| h.samples())
        .unwrap_or(&[])
}

fn window(ctx: &DetectionContext<'_>) -> Duration {
    Duration::from_secs(ctx.config.confirmation_window_secs)
}

pub fn detect_exit(ctx: &DetectionContext<'_>, state: &mut PresenceState) -> Result<Option<ActivityLabel>> {
    let elapsed = ctx.clock.elapsed();

    if !state.away {
        if let Some(edge) = state.exit_edges.advance(entry_samples(ctx)) {
            debug!("entry closed (sample {}), exit window armed", edge);
            state.pending_exit = Some(elapsed);
        }

        if let Some(armed) = state.pending_exit {
            if elapsed.saturating_sub(armed) >= window(ctx) {
                state.pending_exit = None;
                if ctx.motion_sensors().all(|s| !ctx.is_active(s)) {
                    info!("no motion after the entry closed, occupant left at {}", ctx.clock.time_of_day());
                    state.away = true;
                } else {
                    debug!("motion after the entry closed, exit discarded");
                }
            }
        }
    }

    Ok(state.away.then_some(ActivityLabel::LeavingHome))
}

pub fn detect_return(ctx: &DetectionContext<'_>, state: &mut PresenceState) -> Result<Option<ActivityLabel>> {
    let samples = entry_samples(ctx);

    if !state.away {
        // keep pace so edges from before the exit never open a return window
        state.return_edges.skip_to_end(samples);
        return Ok(None);
    }

    let elapsed = ctx.clock.elapsed();
    if state.return_edges.advance(samples).is_some() && state.pending_return.is_none() {
        debug!("entry closed while away, return window opened");
        state.pending_return = Some(elapsed);
    }

    let Some(opened) = state.pending_return else {
        return Ok(None);
    };

    if elapsed.saturating_sub(opened) > window(ctx) {
        debug!("no motion after the entry closed, still away");
        state.pending_return = None;
        return Ok(None);
    }

    if ctx.motion_sensors().any(|s| ctx.is_active(s)) {
        info!("motion after the entry closed, occupant returned at {}", ctx.clock.time_of_day());
        state.pending_return = None;
        state.pending_exit = None;
        state.away = false;
        state.exit_edges.skip_to_end(samples);
        return Ok(Some(ActivityLabel::ReturningHome));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::testing::Home;
    use crate::geometry::Point;
    use crate::sensors::{Sensor, SensorKind};

    fn home() -> Home {
        Home::new("08:00")
            .with_sensor(Sensor::new("entrance", SensorKind::Switch, Point::new(0.0, 0.0)))
            .with_sensor(Sensor::new("hall_pir", SensorKind::Motion, Point::new(50.0, 0.0)))
            .with_sensor(Sensor::new("kitchen_pir", SensorKind::Motion, Point::new(200.0, 0.0)))
    }

    fn run(home: &Home, state: &mut PresenceState) -> (Option<ActivityLabel>, Option<ActivityLabel>) {
        let ctx = home.context();
        let exit = detect_exit(&ctx, state).unwrap();
        let ret = detect_return(&ctx, state).unwrap();
        (exit, ret)
    }

    /// Open and close the entrance, then let the exit confirm
    fn leave(home: &mut Home, state: &mut PresenceState) {
        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        home.set("hall_pir", 0.0);
        run(home, state);
        home.wait(5);
        assert_eq!(run(home, state).0, Some(ActivityLabel::LeavingHome));
    }

    #[test]
    fn test_exit_confirms_after_window_without_motion() {
        let mut home = home();
        let mut state = PresenceState::default();

        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        assert_eq!(run(&home, &mut state), (None, None));
        assert!(state.exit_pending());

        home.wait(4);
        assert_eq!(run(&home, &mut state), (None, None));

        home.wait(1);
        assert_eq!(run(&home, &mut state).0, Some(ActivityLabel::LeavingHome));

        // latched
        home.wait(30);
        assert_eq!(run(&home, &mut state).0, Some(ActivityLabel::LeavingHome));
    }

    #[test]
    fn test_motion_at_expiry_blocks_exit() {
        let mut home = home();
        let mut state = PresenceState::default();

        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        run(&home, &mut state);

        home.wait(5);
        home.set("kitchen_pir", 1.0);
        assert_eq!(run(&home, &mut state), (None, None));
        assert!(!state.is_away());
        assert!(!state.exit_pending());
    }

    #[test]
    fn test_duplicate_edges_in_one_tick_processed_once() {
        let mut home = home();
        let mut state = PresenceState::default();

        for v in [1.0, 0.0, 1.0, 0.0] {
            home.set("entrance", v);
        }
        run(&home, &mut state);
        home.wait(3);
        // no new edge: the window is not re-armed
        run(&home, &mut state);
        home.wait(2);
        assert_eq!(run(&home, &mut state).0, Some(ActivityLabel::LeavingHome));
    }

    #[test]
    fn test_new_edge_rearms_window() {
        let mut home = home();
        let mut state = PresenceState::default();

        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        run(&home, &mut state);
        home.wait(3);
        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        run(&home, &mut state);
        home.wait(3);
        assert_eq!(run(&home, &mut state).0, None);
        home.wait(2);
        assert_eq!(run(&home, &mut state).0, Some(ActivityLabel::LeavingHome));
    }

    #[test]
    fn test_return_with_motion_inside_window() {
        let mut home = home();
        let mut state = PresenceState::default();
        leave(&mut home, &mut state);

        home.wait(60);
        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        assert_eq!(run(&home, &mut state), (Some(ActivityLabel::LeavingHome), None));
        assert!(state.return_pending());

        home.wait(5);
        home.set("hall_pir", 1.0);
        assert_eq!(
            run(&home, &mut state),
            (Some(ActivityLabel::LeavingHome), Some(ActivityLabel::ReturningHome))
        );
        assert!(!state.is_away());

        // fires once, and the return edge does not re-arm the exit
        home.wait(1);
        home.set("hall_pir", 0.0);
        assert_eq!(run(&home, &mut state), (None, None));
        assert!(!state.exit_pending());
    }

    #[test]
    fn test_return_times_out_at_sixth_second() {
        let mut home = home();
        let mut state = PresenceState::default();
        leave(&mut home, &mut state);

        home.wait(10);
        home.set("entrance", 1.0);
        home.set("entrance", 0.0);
        run(&home, &mut state);

        home.wait(6);
        assert_eq!(run(&home, &mut state), (Some(ActivityLabel::LeavingHome), None));
        assert!(!state.return_pending());

        // motion after the timeout does not bring the occupant back
        home.wait(1);
        home.set("hall_pir", 1.0);
        assert_eq!(run(&home, &mut state), (Some(ActivityLabel::LeavingHome), None));
        assert!(state.is_away());
    }

    #[test]
    fn test_no_entry_switch_never_triggers() {
        let mut home = Home::new("08:00")
            .with_sensor(Sensor::new("hall_pir", SensorKind::Motion, Point::default()));
        let mut state = PresenceState::default();
        for _ in 0..10 {
            assert_eq!(run(&home, &mut state), (None, None));
            home.wait(1);
        }
    }
}
