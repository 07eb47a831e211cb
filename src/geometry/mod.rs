//! Geometry module - floor plan primitives and visibility queries

mod visibility;

pub use visibility::*;

use serde::{Deserialize, Serialize};

/// A point on the floor plan
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A straight segment between two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn midpoint(&self) -> Point {
        self.a.midpoint(self.b)
    }

    pub fn length(&self) -> f64 {
        self.a.distance_to(self.b)
    }

    /// True if `p` projects onto the segment and lies closer than `tolerance`.
    /// Segments shorter than the tolerance never match.
    pub fn is_near(&self, p: Point, tolerance: f64) -> bool {
        let len = self.length();
        if len < tolerance {
            return false;
        }
        let dx = self.b.x - self.a.x;
        let dy = self.b.y - self.a.y;
        let u = ((p.x - self.a.x) * dx + (p.y - self.a.y) * dy) / (len * len);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }
        let projected = Point::new(self.a.x + u * dx, self.a.y + u * dy);
        p.distance_to(projected) < tolerance
    }
}

/// Door open/close state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Open,
    #[default]
    Closed,
}

impl DoorState {
    pub fn toggled(self) -> Self {
        match self {
            DoorState::Open => DoorState::Closed,
            DoorState::Closed => DoorState::Open,
        }
    }

    /// Value mirrored by a contact switch mounted on the door
    pub fn switch_value(self) -> f64 {
        match self {
            DoorState::Open => 1.0,
            DoorState::Closed => 0.0,
        }
    }
}

/// A door: opaque only while closed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub segment: Segment,
    pub state: DoorState,
}

impl Door {
    pub fn new(segment: Segment, state: DoorState) -> Self {
        Self { segment, state }
    }

    pub fn is_closed(&self) -> bool {
        self.state == DoorState::Closed
    }
}

/// A named reference point ("bed1", "table", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub position: Point,
}

/// Static floor plan: walls, doors and named reference points
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub walls: Vec<Segment>,
    pub doors: Vec<Door>,
    pub points: Vec<NamedPoint>,
}

impl Layout {
    /// Reference points whose name is `prefix` optionally followed by digits,
    /// compared case-insensitively ("bed", "Bed2", "BED10").
    pub fn points_named<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a NamedPoint> + 'a {
        self.points.iter().filter(move |p| matches_numbered_name(&p.name, prefix))
    }

    pub fn toggle_door(&mut self, index: usize) -> Option<DoorState> {
        let door = self.doors.get_mut(index)?;
        door.state = door.state.toggled();
        Some(door.state)
    }

    /// Index of the first door whose segment passes within `tolerance` of `p`
    pub fn door_near(&self, p: Point, tolerance: f64) -> Option<usize> {
        self.doors.iter().position(|d| d.segment.is_near(p, tolerance))
    }
}

/// `name` equals `prefix` (ignoring case) followed by zero or more ASCII digits
pub fn matches_numbered_name(name: &str, prefix: &str) -> bool {
    if name.len() < prefix.len() || !name.is_char_boundary(prefix.len()) {
        return false;
    }
    let (head, tail) = name.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix) && tail.chars().all(|c| c.is_ascii_digit())
}
