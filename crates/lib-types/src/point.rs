//! Three-dimensional points, vectors and rays.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A 3-component point or displacement (x, y, z).
///
/// The x axis is the drift direction.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Displacements share the point representation.
pub type Vector = Point;

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Vector magnitude (L2 norm).
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Normalize to unit length. Returns the zero vector if magnitude is zero.
    pub fn norm(&self) -> Self {
        let m = self.magnitude();
        if m == 0.0 {
            Self::ORIGIN
        } else {
            *self * (1.0 / m)
        }
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Copy with the x coordinate replaced.
    pub fn with_x(&self, x: f64) -> Self {
        Self { x, ..*self }
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Point {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A directed line segment from `tail` to `head`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub tail: Point,
    pub head: Point,
}

impl Ray {
    pub fn new(tail: Point, head: Point) -> Self {
        Self { tail, head }
    }

    /// Displacement from tail to head.
    pub fn vector(&self) -> Vector {
        self.head - self.tail
    }

    pub fn length(&self) -> f64 {
        self.vector().magnitude()
    }

    /// Unit vector pointing from tail to head.
    pub fn unit(&self) -> Vector {
        self.vector().norm()
    }
}
