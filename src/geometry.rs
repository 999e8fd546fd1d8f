//! Planar geometry primitives shared by the mesh builder and the stitcher.
//!
//! All coordinates are relative to the center of the map, so a map of
//! extent `w x h` spans `[-w/2, w/2] x [-h/2, h/2]`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A 2D position or vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(&self, other: Point) -> f64 {
        (*self - other).length()
    }

    pub fn distance_squared(&self, other: Point) -> f64 {
        (*self - other).length_squared()
    }

    pub fn midpoint(&self, other: Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
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

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Rectangular map extent, centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 2.0,
        }
    }
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn half_width(&self) -> f64 {
        0.5 * self.width
    }

    pub fn half_height(&self) -> f64 {
        0.5 * self.height
    }

    pub fn min(&self) -> Point {
        Point::new(-self.half_width(), -self.half_height())
    }

    pub fn max(&self) -> Point {
        Point::new(self.half_width(), self.half_height())
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= -self.half_width()
            && p.x <= self.half_width()
            && p.y >= -self.half_height()
            && p.y <= self.half_height()
    }

    /// Corners in counter-clockwise order, starting bottom-left.
    pub fn corners(&self) -> [Point; 4] {
        let (w, h) = (self.half_width(), self.half_height());
        [
            Point::new(-w, -h),
            Point::new(w, -h),
            Point::new(w, h),
            Point::new(-w, h),
        ]
    }

    /// Length of the diagonal; an upper bound on any in-extent distance.
    pub fn diagonal(&self) -> f64 {
        (self.width * self.width + self.height * self.height).sqrt()
    }
}

/// Mean of a set of points. Returns the origin for an empty set.
pub fn vertex_mean(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ZERO;
    }
    let sum = points.iter().fold(Point::ZERO, |acc, &p| acc + p);
    sum * (1.0 / points.len() as f64)
}

/// Signed area of a simple polygon (positive when counter-clockwise).
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice_area += a.cross(b);
    }
    0.5 * twice_area
}
