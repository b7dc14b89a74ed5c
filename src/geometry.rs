use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};

/// Distances below this are treated as coincident.
pub const GEOMETRY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, y axis pointing down).
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Point) -> f32 {
        (other - self).length()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        if len <= GEOMETRY_EPSILON || !len.is_finite() {
            return None;
        }
        Some(Point::new(self.x / len, self.y / len))
    }

    /// Left-hand perpendicular in screen space: `(-y, x)`.
    pub fn perpendicular(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn midpoint(self, other: Point) -> Point {
        self.lerp(other, 0.5)
    }

    /// Point at `distance` from `self` in direction `angle`.
    pub fn polar_offset(self, angle: f32, distance: f32) -> Point {
        self + Point::from_angle(angle) * distance
    }

    /// Angle of the vector from `self` to `other`, with a `0.0` fallback when
    /// the two points coincide.
    pub fn angle_to(self, other: Point) -> f32 {
        let delta = other - self;
        if delta.length() <= GEOMETRY_EPSILON {
            return 0.0;
        }
        delta.y.atan2(delta.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalised rectangle spanned by two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    pub fn with_padding(&self, padding: f32) -> Rect {
        Rect::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }
}

/// Normalise an angle into `(-PI, PI]`.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut value = angle % (2.0 * PI);
    if value <= -PI {
        value += 2.0 * PI;
    } else if value > PI {
        value -= 2.0 * PI;
    }
    value
}

/// Shortest distance from `point` to the segment `a`-`b`.
pub fn point_segment_distance(point: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}
