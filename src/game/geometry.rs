//! Geometry and collision primitives
//!
//! Pure functions only. Everything here is deterministic and allocation free.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// 2D point or vector in board units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for zero/non-finite input
    pub fn normalize(self) -> Option<Vec2> {
        let len = self.length();
        if !len.is_finite() || len == 0.0 {
            return None;
        }
        Some(Vec2::new(self.x / len, self.y / len))
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Axis of a velocity component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// True if the two centres are strictly closer than `radius`
pub fn circles_overlap(a: Vec2, b: Vec2, radius: f64) -> bool {
    a.distance(b) < radius
}

/// First contact of a moving circle with a rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Fraction of the motion completed at contact, in `0.0..=1.0`
    pub time: f64,
    pub reflect_x: bool,
    pub reflect_y: bool,
}

/// Sweep a circle of `radius` from `start` along `delta` against `rect`.
///
/// Works on the rectangle expanded by `radius`, so a wall thinner than one
/// step of travel is still hit on the face it is entered through. A circle
/// already inside is pushed back through its nearest face, and only if it
/// is moving deeper; one that is leaving has no contact.
pub fn sweep_circle_rect(start: Vec2, delta: Vec2, radius: f64, rect: &Rect) -> Option<Contact> {
    let min = Vec2::new(rect.x - radius, rect.y - radius);
    let max = Vec2::new(rect.right() + radius, rect.bottom() + radius);

    let (enter_x, exit_x) = slab(start.x, delta.x, min.x, max.x)?;
    let (enter_y, exit_y) = slab(start.y, delta.y, min.y, max.y)?;
    let enter = enter_x.max(enter_y);
    let exit = exit_x.min(exit_y);
    if enter >= exit || exit <= 0.0 || enter > 1.0 {
        return None;
    }

    if enter < 0.0 {
        return embedded_contact(start, delta, min, max);
    }

    Some(Contact {
        time: enter,
        reflect_x: enter_x >= enter_y,
        reflect_y: enter_y >= enter_x,
    })
}

/// Entry and exit times of one coordinate against `min..max`
fn slab(origin: f64, delta: f64, min: f64, max: f64) -> Option<(f64, f64)> {
    if delta == 0.0 {
        return (origin > min && origin < max).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let a = (min - origin) / delta;
    let b = (max - origin) / delta;
    Some((a.min(b), a.max(b)))
}

fn embedded_contact(start: Vec2, delta: Vec2, min: Vec2, max: Vec2) -> Option<Contact> {
    let faces = [
        (start.x - min.x, Axis::X, delta.x > 0.0),
        (max.x - start.x, Axis::X, delta.x < 0.0),
        (start.y - min.y, Axis::Y, delta.y > 0.0),
        (max.y - start.y, Axis::Y, delta.y < 0.0),
    ];
    let (_, axis, inward) = faces.into_iter().min_by(|a, b| a.0.total_cmp(&b.0))?;
    inward.then_some(Contact {
        time: 0.0,
        reflect_x: axis == Axis::X,
        reflect_y: axis == Axis::Y,
    })
}

/// Square of side `size` anchored at `origin` (top-left) against a rectangle
pub fn square_rect_overlap(origin: Vec2, size: f64, rect: &Rect) -> bool {
    let hit_x = origin.x + size > rect.x && origin.x < rect.right();
    let hit_y = origin.y + size > rect.y && origin.y < rect.bottom();
    hit_x && hit_y
}

/// Reflect one velocity component
pub fn reflect(axis: Axis, velocity: Vec2) -> Vec2 {
    match axis {
        Axis::X => Vec2::new(-velocity.x, velocity.y),
        Axis::Y => Vec2::new(velocity.x, -velocity.y),
    }
}
