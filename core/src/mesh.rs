//! Triangle meshes

use crate::base::Float;
use crate::geometry::{Point3f, Ray, Segment, Vector3f};
use crate::material::Material;
use crate::rng::Rng;
use crate::triangle::Triangle;

/// A ray/mesh intersection.
pub struct SurfaceHit {
    /// The intersection point.
    pub p: Point3f,

    /// Surface normal at the hit, oriented against the incoming ray.
    pub n: Vector3f,

    /// Index of the hit triangle's material.
    pub material: usize,
}

/// A set of triangles that together make an object reflecting sound rays.
/// The volume does not need to be closed and triangles are two-sided. The
/// scene merges all inputs into a single combined mesh, so intersection
/// queries only ever run against one instance. A mesh can also act as the
/// emitting surface of an area sound source.
#[derive(Clone, Default)]
pub struct Mesh {
    /// The triangles.
    pub tris: Vec<Triangle>,

    /// Axis-aligned bounding box, `(min, max)`.
    pub bounds: (Point3f, Point3f),

    total_area: Float,
    total_weighted_area: Float,
}

impl Mesh {
    /// Creates a mesh over a set of triangles sharing one material.
    ///
    /// * `tris`      - The triangles.
    /// * `materials` - The scene's material table, used to weight surface
    ///                 areas by mid-band absorption.
    pub fn new(tris: Vec<Triangle>, materials: &[Material]) -> Self {
        let mut mesh = Self::empty();
        for tri in &tris {
            mesh.total_area += tri.area;
            mesh.total_weighted_area += tri.area * materials[tri.material].absorption[1];
        }
        mesh.tris = tris;
        mesh.recompute_bounds();
        mesh
    }

    /// Creates a mesh with no triangles; every query on it misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates an emitter mesh, which has no material of its own; only its
    /// surface geometry matters.
    ///
    /// * `tris` - The triangles.
    pub fn emitter(tris: Vec<Triangle>) -> Self {
        let mut mesh = Self::empty();
        mesh.total_area = tris.iter().map(|t| t.area).sum();
        mesh.tris = tris;
        mesh.recompute_bounds();
        mesh
    }

    /// Merges another mesh's triangles into this one.
    ///
    /// * `other` - The mesh to merge.
    pub fn combine(&mut self, other: Mesh) {
        self.tris.extend(other.tris);
        self.total_area += other.total_area;
        self.total_weighted_area += other.total_weighted_area;
        self.recompute_bounds();
    }

    fn recompute_bounds(&mut self) {
        let mut min = Point3f::new(1e9, 1e9, 1e9);
        let mut max = Point3f::new(-1e9, -1e9, -1e9);
        for tri in &self.tris {
            for v in &tri.verts {
                min.x = crate::base::min(min.x, v.x);
                min.y = crate::base::min(min.y, v.y);
                min.z = crate::base::min(min.z, v.z);
                max.x = crate::base::max(max.x, v.x);
                max.y = crate::base::max(max.y, v.y);
                max.z = crate::base::max(max.z, v.z);
            }
        }
        self.bounds = (min, max);
    }

    /// Finds the nearest intersection of a ray with the mesh by scanning
    /// all triangles. Hits closer than 1e-3 along the ray are rejected so
    /// that rays spawned on a surface do not immediately re-hit it.
    ///
    /// * `ray` - The ray.
    pub fn ray_intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        let mut nearest: Option<(Float, &Triangle)> = None;
        for tri in &self.tris {
            if let Some(t) = tri.intersect(ray) {
                if t > 1e-3 && nearest.map_or(true, |(d, _)| t < d) {
                    nearest = Some((t, tri));
                }
            }
        }
        nearest.map(|(t, tri)| {
            let n = if tri.normal.dot(&ray.d) > 0.0 {
                -tri.normal
            } else {
                tri.normal
            };
            SurfaceHit {
                p: ray.at(t),
                n,
                material: tri.material,
            }
        })
    }

    /// Returns whether a line segment is obstructed by the mesh. The
    /// parametric range is restricted to the segment's interior, excluding
    /// its endpoints.
    ///
    /// * `seg` - The segment.
    pub fn line_intersect(&self, seg: &Segment) -> bool {
        let ray = Ray::new(seg.from, seg.dir());
        self.tris.iter().any(|tri| {
            tri.intersect(&ray)
                .map_or(false, |t| t > 1e-5 && t < 1.0)
        })
    }

    /// Samples a point uniformly over the mesh surface, together with the
    /// normal of the sampled triangle.
    ///
    /// * `rng` - Random number generator.
    pub fn sample_point(&self, rng: &mut Rng) -> (Point3f, Vector3f) {
        let mut x = rng.range_float(self.total_area);
        for tri in &self.tris {
            x -= tri.area;
            if x < 0.0 {
                return (tri.sample_point(rng), tri.normal);
            }
        }
        match self.tris.last() {
            Some(tri) => (tri.sample_point(rng), tri.normal),
            None => (Point3f::origin(), Vector3f::zero()),
        }
    }

    /// Returns the surface area of the mesh.
    pub fn area(&self) -> Float {
        self.total_area
    }

    /// Returns the surface area weighted by mid-band absorption, the Total
    /// Absorption in Sabins used by the statistical reverberation formulas.
    pub fn total_absorption(&self) -> Float {
        self.total_weighted_area
    }

    /// Returns the average mid-band absorption over the surface.
    pub fn average_absorption(&self) -> Float {
        self.total_weighted_area / self.total_area
    }

    /// Returns the enclosed volume of the mesh. Only meaningful for closed,
    /// consistently wound surfaces.
    pub fn volume(&self) -> Float {
        self.tris.iter().map(Triangle::signed_volume).sum()
    }
}

/// Builds the twelve outward-wound triangles of an axis-aligned box. Used
/// by tests and useful for programmatic scenes.
///
/// * `min`      - Minimum corner.
/// * `max`      - Maximum corner.
/// * `material` - Material index for all faces.
pub fn box_triangles(min: Point3f, max: Point3f, material: usize) -> Vec<Triangle> {
    let p = |x, y, z| Point3f::new(x, y, z);
    let (a, b) = (min, max);
    let quads = [
        [p(a.x, a.y, a.z), p(a.x, b.y, a.z), p(b.x, b.y, a.z), p(b.x, a.y, a.z)],
        [p(a.x, a.y, b.z), p(b.x, a.y, b.z), p(b.x, b.y, b.z), p(a.x, b.y, b.z)],
        [p(a.x, a.y, a.z), p(b.x, a.y, a.z), p(b.x, a.y, b.z), p(a.x, a.y, b.z)],
        [p(a.x, b.y, a.z), p(a.x, b.y, b.z), p(b.x, b.y, b.z), p(b.x, b.y, a.z)],
        [p(a.x, a.y, a.z), p(a.x, a.y, b.z), p(a.x, b.y, b.z), p(a.x, b.y, a.z)],
        [p(b.x, a.y, a.z), p(b.x, b.y, a.z), p(b.x, b.y, b.z), p(b.x, a.y, b.z)],
    ];
    let mut tris = Vec::with_capacity(12);
    for q in quads {
        tris.push(Triangle::new(q[0], q[1], q[2], material));
        tris.push(Triangle::new(q[0], q[2], q[3], material));
    }
    tris
}
