//! Rays and line segments

#![allow(dead_code)]

use super::{Point3f, Vector3f};
use crate::base::Float;

/// A ray with an origin and a direction of travel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Origin.
    pub o: Point3f,

    /// Direction. Not necessarily normalized.
    pub d: Vector3f,
}

impl Ray {
    /// Creates a new ray.
    ///
    /// * `o` - Origin.
    /// * `d` - Direction.
    pub fn new(o: Point3f, d: Vector3f) -> Self {
        Self { o, d }
    }

    /// Get position along the ray at given parameter.
    ///
    /// * `t` - Parameter to evaluate.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

/// A line segment between two points, parameterized over `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Segment {
    /// Start point.
    pub from: Point3f,

    /// End point.
    pub to: Point3f,
}

impl Segment {
    /// Creates a new line segment.
    ///
    /// * `from` - Start point.
    /// * `to`   - End point.
    pub fn new(from: Point3f, to: Point3f) -> Self {
        Self { from, to }
    }

    /// Returns the unnormalized direction from start to end.
    pub fn dir(&self) -> Vector3f {
        self.to - self.from
    }

    /// Returns the segment's length.
    pub fn length(&self) -> Float {
        self.dir().length()
    }
}
