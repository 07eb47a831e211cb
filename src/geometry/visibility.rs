// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/homesim

//! Line-of-sight and field-of-view reasoning through walls and doors
//!
//! Pure functions, no state. All tests are exact: no epsilon is applied to
//! orientation or containment checks.

use super::{Door, Point, Segment};

/// Anything positioned on the floor plan that can "see" a point
pub trait Observer {
    fn position(&self) -> Point;

    /// Facing direction in degrees, `None` for non-directional observers
    fn orientation(&self) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Collinear,
    Clockwise,
    CounterClockwise,
}

fn orientation(p: Point, q: Point, r: Point) -> Orientation {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val == 0.0 {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::CounterClockwise
    }
}

/// `r` lies inside the bounding box of `p`-`q` (used once collinearity is known)
fn on_segment(p: Point, q: Point, r: Point) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// True if segment `a1`-`a2` intersects segment `b1`-`b2`, including
/// touching endpoints and collinear overlap
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o1 = orientation(a1, a2, b1);
    let o2 = orientation(a1, a2, b2);
    let o3 = orientation(b1, b2, a1);
    let o4 = orientation(b1, b2, a2);

    if o1 != o2 && o3 != o4 {
        return true;
    }

    (o1 == Orientation::Collinear && on_segment(a1, a2, b1))
        || (o2 == Orientation::Collinear && on_segment(a1, a2, b2))
        || (o3 == Orientation::Collinear && on_segment(b1, b2, a1))
        || (o4 == Orientation::Collinear && on_segment(b1, b2, a2))
}

/// True iff `point` is within `max_distance` of the observer and inside its
/// `fov_angle` cone. Observers without an orientation never see anything.
pub fn in_field_of_view<O: Observer + ?Sized>(
    observer: &O,
    point: Point,
    max_distance: f64,
    fov_angle: f64,
) -> bool {
    let Some(direction) = observer.orientation() else {
        return false;
    };

    let origin = observer.position();
    let dx = point.x - origin.x;
    let dy = point.y - origin.y;
    if dx.hypot(dy) > max_distance {
        return false;
    }

    let angle = dy.atan2(dx).to_degrees().rem_euclid(360.0);
    // wrapped into (-180, 180]
    let mut relative = (angle - direction.rem_euclid(360.0)).rem_euclid(360.0);
    if relative > 180.0 {
        relative -= 360.0;
    }
    relative.abs() <= fov_angle / 2.0
}

/// True if any wall, or any closed door, crosses the segment `p1`-`p2`
pub fn path_blocked(p1: Point, p2: Point, walls: &[Segment], doors: &[Door]) -> bool {
    walls.iter().any(|w| segments_intersect(p1, p2, w.a, w.b))
        || doors
            .iter()
            .filter(|d| d.is_closed())
            .any(|d| segments_intersect(p1, p2, d.segment.a, d.segment.b))
}

fn sorted_by_distance<'a, O, I>(point: Point, candidates: I) -> Vec<&'a O>
where
    O: Observer + 'a,
    I: IntoIterator<Item = &'a O>,
{
    let mut sorted: Vec<&O> = candidates.into_iter().collect();
    // stable: equal distances keep their input order
    sorted.sort_by(|a, b| {
        point
            .distance_to(a.position())
            .total_cmp(&point.distance_to(b.position()))
    });
    sorted
}

/// Nearest observer that has `point` in its field of view and an
/// unobstructed line to it
pub fn closest_in_fov_with_line_of_sight<'a, O, I>(
    point: Point,
    observers: I,
    walls: &[Segment],
    doors: &[Door],
    max_distance: f64,
    fov_angle: f64,
) -> Option<&'a O>
where
    O: Observer + 'a,
    I: IntoIterator<Item = &'a O>,
{
    let visible = observers
        .into_iter()
        .filter(|o| in_field_of_view(*o, point, max_distance, fov_angle));

    sorted_by_distance(point, visible)
        .into_iter()
        .find(|o| !path_blocked(o.position(), point, walls, doors))
}

/// Nearest observer with no wall between it and `point`.
/// Ignores orientation and doors.
pub fn closest_unobstructed<'a, O, I>(point: Point, observers: I, walls: &[Segment]) -> Option<&'a O>
where
    O: Observer + 'a,
    I: IntoIterator<Item = &'a O>,
{
    sorted_by_distance(point, observers)
        .into_iter()
        .find(|o| !path_blocked(point, o.position(), walls, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DoorState;
    use proptest::prelude::*;

    struct Eye {
        at: Point,
        facing: Option<f64>,
        tag: &'static str,
    }

    impl Observer for Eye {
        fn position(&self) -> Point {
            self.at
        }

        fn orientation(&self) -> Option<f64> {
            self.facing
        }
    }

    fn eye(x: f64, y: f64, facing: Option<f64>, tag: &'static str) -> Eye {
        Eye { at: Point::new(x, y), facing, tag }
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_crossing_segments() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(10.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(4.0, 4.0), p(0.0, 10.0), p(10.0, 10.0)));
    }

    #[test]
    fn test_collinear_overlap_and_touching() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 0.0), p(15.0, 0.0)));
        assert!(!segments_intersect(p(0.0, 0.0), p(4.0, 0.0), p(5.0, 0.0), p(15.0, 0.0)));
        // endpoint touch counts
        assert!(segments_intersect(p(0.0, 0.0), p(5.0, 5.0), p(5.0, 5.0), p(10.0, 0.0)));
    }

    #[test]
    fn test_field_of_view() {
        let sensor = eye(0.0, 0.0, Some(0.0), "s");
        assert!(in_field_of_view(&sensor, p(100.0, 0.0), 150.0, 60.0));
        // 30 degrees off-axis is the edge of a 60 degree cone
        let edge = p(100.0 * 30f64.to_radians().cos(), 100.0 * 30f64.to_radians().sin());
        assert!(in_field_of_view(&sensor, p(edge.x, edge.y - 1e-6), 150.0, 60.0));
        assert!(!in_field_of_view(&sensor, p(50.0, 50.0), 150.0, 60.0));
        assert!(!in_field_of_view(&sensor, p(200.0, 0.0), 150.0, 60.0));
        assert!(!in_field_of_view(&sensor, p(-100.0, 0.0), 150.0, 60.0));
    }

    #[test]
    fn test_field_of_view_wraps_around_zero() {
        let sensor = eye(0.0, 0.0, Some(350.0), "s");
        assert!(in_field_of_view(&sensor, p(100.0, 10.0), 150.0, 60.0));
        assert!(in_field_of_view(&sensor, p(100.0, -10.0), 150.0, 60.0));

        let negative = eye(0.0, 0.0, Some(-90.0), "s");
        assert!(in_field_of_view(&negative, p(0.0, -50.0), 150.0, 60.0));
    }

    #[test]
    fn test_no_orientation_never_sees() {
        let sensor = eye(0.0, 0.0, None, "s");
        assert!(!in_field_of_view(&sensor, p(1.0, 0.0), 150.0, 360.0));
    }

    #[test]
    fn test_doors_block_only_when_closed() {
        let door_seg = Segment::new(p(50.0, -20.0), p(50.0, 20.0));
        let closed = [Door::new(door_seg, DoorState::Closed)];
        let open = [Door::new(door_seg, DoorState::Open)];
        assert!(path_blocked(p(0.0, 0.0), p(100.0, 0.0), &[], &closed));
        assert!(!path_blocked(p(0.0, 0.0), p(100.0, 0.0), &[], &open));
        assert!(path_blocked(p(0.0, 0.0), p(100.0, 0.0), &[door_seg], &open));
    }

    #[test]
    fn test_closest_in_fov_skips_blocked() {
        let target = p(100.0, 0.0);
        let sensors = vec![
            eye(90.0, 0.0, Some(180.0), "facing_away"),
            eye(0.0, 0.0, Some(0.0), "far_clear"),
        ];
        let found = closest_in_fov_with_line_of_sight(target, &sensors, &[], &[], 150.0, 60.0);
        assert_eq!(found.map(|s| s.tag), Some("far_clear"));

        // wall between the near sensor and the target, above the far sensor's line
        let sensors = vec![
            eye(60.0, 10.0, Some(0.0), "near_behind_wall"),
            eye(0.0, 0.0, Some(0.0), "far_clear"),
        ];
        let walls = [Segment::new(p(80.0, 2.0), p(80.0, 50.0))];
        let found = closest_in_fov_with_line_of_sight(target, &sensors, &walls, &[], 150.0, 60.0);
        assert_eq!(found.map(|s| s.tag), Some("far_clear"));
    }

    #[test]
    fn test_closest_in_fov_tie_keeps_input_order() {
        let target = p(0.0, 0.0);
        let sensors = vec![
            eye(-10.0, 0.0, Some(0.0), "first"),
            eye(10.0, 0.0, Some(180.0), "second"),
        ];
        let found = closest_in_fov_with_line_of_sight(target, &sensors, &[], &[], 150.0, 60.0);
        assert_eq!(found.map(|s| s.tag), Some("first"));
    }

    #[test]
    fn test_closest_unobstructed_ignores_doors_and_fov() {
        let target = p(0.0, 0.0);
        let sensors = vec![eye(30.0, 0.0, None, "a"), eye(-50.0, 0.0, None, "b")];
        let walls = [Segment::new(p(20.0, -10.0), p(20.0, 10.0))];
        let found = closest_unobstructed(target, &sensors, &walls);
        assert_eq!(found.map(|s| s.tag), Some("b"));

        let nobody: Vec<Eye> = Vec::new();
        assert!(closest_unobstructed(target, &nobody, &walls).is_none());
    }

    proptest! {
        #[test]
        fn prop_intersection_is_symmetric(
            ax in -100i32..100, ay in -100i32..100, bx in -100i32..100, by in -100i32..100,
            cx in -100i32..100, cy in -100i32..100, dx in -100i32..100, dy in -100i32..100,
        ) {
            let (a, b) = (p(ax as f64, ay as f64), p(bx as f64, by as f64));
            let (c, d) = (p(cx as f64, cy as f64), p(dx as f64, dy as f64));
            prop_assert_eq!(segments_intersect(a, b, c, d), segments_intersect(c, d, a, b));
            prop_assert_eq!(segments_intersect(a, b, c, d), segments_intersect(b, a, d, c));
        }

        #[test]
        fn prop_field_of_view_wraps_full_turns(
            facing in 0i32..360, offset in -180i32..180, turns in -2i32..3,
        ) {
            let angle = ((facing + offset) as f64).to_radians();
            let target = p(100.0 * angle.cos(), 100.0 * angle.sin());
            let sensor = eye(0.0, 0.0, Some(facing as f64), "s");
            let turned = eye(0.0, 0.0, Some((facing + 360 * turns) as f64), "s");

            // one degree of slack either side of the cone edge
            if offset.abs() <= 29 {
                prop_assert!(in_field_of_view(&sensor, target, 150.0, 60.0));
            } else if offset.abs() >= 31 {
                prop_assert!(!in_field_of_view(&sensor, target, 150.0, 60.0));
            }
            prop_assert_eq!(
                in_field_of_view(&sensor, target, 150.0, 60.0),
                in_field_of_view(&turned, target, 150.0, 60.0)
            );
        }

        #[test]
        fn prop_equidistant_observers_keep_input_order(d in 1i32..100, vertical in any::<bool>()) {
            let d = d as f64;
            let (a, b) = if vertical {
                (eye(0.0, -d, Some(90.0), "a"), eye(0.0, d, Some(270.0), "b"))
            } else {
                (eye(-d, 0.0, Some(0.0), "a"), eye(d, 0.0, Some(180.0), "b"))
            };
            let target = p(0.0, 0.0);

            let forward = [a, b];
            let found = closest_in_fov_with_line_of_sight(target, &forward, &[], &[], 150.0, 60.0);
            prop_assert_eq!(found.map(|s| s.tag), Some("a"));
            prop_assert_eq!(closest_unobstructed(target, &forward, &[]).map(|s| s.tag), Some("a"));

            let [a, b] = forward;
            let reversed = [b, a];
            let found = closest_in_fov_with_line_of_sight(target, &reversed, &[], &[], 150.0, 60.0);
            prop_assert_eq!(found.map(|s| s.tag), Some("b"));
            prop_assert_eq!(closest_unobstructed(target, &reversed, &[]).map(|s| s.tag), Some("b"));
        }

        #[test]
        fn prop_open_doors_never_block(
            x1 in -100i32..100, y1 in -100i32..100, x2 in -100i32..100, y2 in -100i32..100,
        ) {
            let door = Door::new(Segment::new(p(x1 as f64, y1 as f64), p(x2 as f64, y2 as f64)), DoorState::Open);
            prop_assert!(!path_blocked(p(-150.0, 0.0), p(150.0, 0.0), &[], &[door]));
        }
    }
}
