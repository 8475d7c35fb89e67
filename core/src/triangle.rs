//! Triangles

use crate::base::Float;
use crate::geometry::{Point3f, Ray, Vector3f};
use crate::rng::Rng;

/// A two-sided triangle. Rays intersect it regardless of which side they
/// approach from; the effective surface normal at a hit is the one opposing
/// the incoming ray. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// The three vertices.
    pub verts: [Point3f; 3],

    /// Cached unit normal of the vertex winding.
    pub normal: Vector3f,

    /// Cached surface area.
    pub area: Float,

    /// Index of the owning material in the scene's material table.
    pub material: usize,
}

impl Triangle {
    /// Creates a new triangle.
    ///
    /// * `a`        - First vertex.
    /// * `b`        - Second vertex.
    /// * `c`        - Third vertex.
    /// * `material` - Index of the owning material.
    pub fn new(a: Point3f, b: Point3f, c: Point3f, material: usize) -> Self {
        let cross = (b - a).cross(&(c - a));
        let len = cross.length();
        // A zero-area triangle is tolerated; it can never be hit.
        let normal = if len > 0.0 {
            cross / len
        } else {
            Vector3f::zero()
        };
        Self {
            verts: [a, b, c],
            normal,
            area: len / 2.0,
            material,
        }
    }

    /// Double-sided Möller-Trumbore intersection test. Returns the ray
    /// parameter of the hit, unfiltered; callers restrict it to their
    /// parametric range of interest.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Option<Float> {
        let e1 = self.verts[1] - self.verts[0];
        let e2 = self.verts[2] - self.verts[0];

        let p = ray.d.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = ray.o - self.verts[0];
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = ray.d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(e2.dot(&q) * inv_det)
    }

    /// Samples a point uniformly over the triangle's surface.
    ///
    /// * `rng` - Random number generator.
    pub fn sample_point(&self, rng: &mut Rng) -> Point3f {
        let r1 = rng.uniform_float();
        let r2 = rng.uniform_float();
        let sr1 = r1.sqrt();
        let a = Vector3f::from(self.verts[0]);
        let b = Vector3f::from(self.verts[1]);
        let c = Vector3f::from(self.verts[2]);
        let p = a * (1.0 - sr1) + b * (sr1 * (1.0 - r2)) + c * (sr1 * r2);
        Point3f::new(p.x, p.y, p.z)
    }

    /// Returns the signed volume of the tetrahedron spanned by this
    /// triangle and the origin. Summed over a closed mesh this yields the
    /// enclosed volume.
    pub fn signed_volume(&self) -> Float {
        let p1 = self.verts[0];
        let p2 = self.verts[1];
        let p3 = self.verts[2];
        let v321 = p3.x * p2.y * p1.z;
        let v231 = p2.x * p3.y * p1.z;
        let v312 = p3.x * p1.y * p2.z;
        let v132 = p1.x * p3.y * p2.z;
        let v213 = p2.x * p1.y * p3.z;
        let v123 = p1.x * p2.y * p3.z;
        (1.0 / 6.0) * (-v321 + v231 + v312 - v132 - v213 + v123)
    }
}
