//! Scene

use crate::base::Float;
use crate::geometry::{Point3f, Ray, Segment, Vector3f};
use crate::listener::Listener;
use crate::material::{BounceKind, Material};
use crate::mesh::Mesh;
use crate::rng::Rng;
use crate::source::SoundSource;

/// The outcome of bouncing a ray off the scene geometry.
pub struct Bounce {
    /// The continuing ray, leaving the hit point.
    pub ray: Ray,

    /// Surface normal at the hit. Flipped to the far side for refractions.
    pub normal: Vector3f,

    /// Length of the segment from the old ray origin to the hit point.
    pub segment_length: Float,

    /// Material index of the hit surface.
    pub material: usize,

    /// Whether the ray reflected or passed through.
    pub kind: BounceKind,
}

/// The scene graph: the material table, all geometry merged into a single
/// combined mesh, the sound sources and the listeners. Immutable once
/// decoding finishes.
#[derive(Default)]
pub struct Scene {
    /// Material table; triangles refer into it by index.
    pub materials: Vec<Material>,

    /// All scene geometry, merged. Intersection queries run on this only.
    pub mesh: Mesh,

    /// The sound sources.
    pub sources: Vec<SoundSource>,

    /// The listeners.
    pub listeners: Vec<Listener>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material and returns its table index.
    ///
    /// * `material` - The material.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Finds a material index by name.
    ///
    /// * `name` - The material name.
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Merges a mesh into the combined scene geometry.
    ///
    /// * `mesh` - The mesh to merge.
    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.mesh.combine(mesh);
    }

    /// Adds a sound source.
    ///
    /// * `source` - The source.
    pub fn add_source(&mut self, source: SoundSource) {
        self.sources.push(source);
    }

    /// Adds a listener.
    ///
    /// * `listener` - The listener.
    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Bounces a ray off the scene. The hit material decides between
    /// reflection and refraction; the continuing direction is sampled from
    /// the hemisphere around the (for refraction: flipped) surface normal,
    /// blended toward the mirror direction (or, for refraction, the
    /// incoming direction) by the material's specularity.
    ///
    /// * `band` - Frequency band.
    /// * `ray`  - The incoming ray.
    /// * `rng`  - Random number generator.
    pub fn bounce(&self, band: usize, ray: &Ray, rng: &mut Rng) -> Option<Bounce> {
        let hit = self.mesh.ray_intersect(ray)?;
        let material = &self.materials[hit.material];
        let kind = material.bounce(band, rng);
        let spec = material.specularity[band];

        let (normal, preferred) = match kind {
            BounceKind::Refract => (-hit.n, ray.d),
            BounceKind::Reflect => (hit.n, ray.d.reflect(&hit.n)),
        };
        let dir = crate::sampling::biased_hemisphere(rng, &normal, &preferred, spec);

        Some(Bounce {
            ray: Ray::new(hit.p, dir),
            normal,
            segment_length: (hit.p - ray.o).length(),
            material: hit.material,
            kind,
        })
    }

    /// Builds the line of sight between two points, or `None` when the
    /// scene geometry obstructs it.
    ///
    /// * `p` - Start point.
    /// * `x` - End point.
    pub fn connect(&self, p: Point3f, x: Point3f) -> Option<Segment> {
        let ls = Segment::new(p, x);
        if self.mesh.line_intersect(&ls) {
            None
        } else {
            Some(ls)
        }
    }
}
