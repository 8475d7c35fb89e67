//! Surface materials.

use crate::base::{Float, NUM_BANDS};
use crate::error::{EngineError, Result};
use crate::rng::Rng;

/// How a ray continues after hitting a surface. Absorption never terminates
/// a path here; it attenuates the carried intensity instead.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BounceKind {
    /// The ray is reflected off the surface.
    Reflect,

    /// The ray passes through the surface.
    Refract,
}

/// The acoustic material of mesh surfaces. All coefficients are per band
/// (low, mid, high) and within [0, 1]; reflection, refraction and absorption
/// sum to one.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name, referenced by meshes.
    pub name: String,

    /// Per-band fraction of energy reflected.
    pub reflection: [Float; NUM_BANDS],

    /// Per-band fraction of energy passing through the surface.
    pub refraction: [Float; NUM_BANDS],

    /// Per-band specularity of the bounce lobe.
    pub specularity: [Float; NUM_BANDS],

    /// Per-band fraction of energy absorbed, `1 - reflection - refraction`.
    pub absorption: [Float; NUM_BANDS],

    /// Per-band fraction of energy that survives a hit, `1 - absorption`.
    pub retained: [Float; NUM_BANDS],
}

impl Material {
    /// Creates a new material, deriving absorption from the reflection and
    /// refraction coefficients. Fails when the coefficients of any band sum
    /// to more than one.
    ///
    /// * `name`        - Material name.
    /// * `reflection`  - Per-band reflection coefficients.
    /// * `refraction`  - Per-band refraction coefficients, `None` for an
    ///                   opaque material.
    /// * `specularity` - Per-band specularity, `None` for fully diffuse.
    pub fn new(
        name: String,
        reflection: [Float; NUM_BANDS],
        refraction: Option<[Float; NUM_BANDS]>,
        specularity: Option<[Float; NUM_BANDS]>,
    ) -> Result<Self> {
        let refraction = refraction.unwrap_or([0.0; NUM_BANDS]);
        let specularity = specularity.unwrap_or([0.0; NUM_BANDS]);

        let mut absorption = [0.0; NUM_BANDS];
        let mut retained = [0.0; NUM_BANDS];
        for b in 0..NUM_BANDS {
            let a = 1.0 - reflection[b] - refraction[b];
            if a < -1e-6 {
                return Err(EngineError::Decode(format!(
                    "invalid material settings for '{name}'"
                )));
            }
            absorption[b] = a.max(0.0);
            retained[b] = 1.0 - absorption[b];
        }

        Ok(Self {
            name,
            reflection,
            refraction,
            specularity,
            absorption,
            retained,
        })
    }

    /// Decides how a ray bounces off this material by drawing from the
    /// relative weight of the reflection and refraction coefficients. A
    /// material with neither reflects.
    ///
    /// * `band` - The frequency band.
    /// * `rng`  - Random number generator.
    pub fn bounce(&self, band: usize, rng: &mut Rng) -> BounceKind {
        let fl = self.reflection[band];
        let fr = self.refraction[band];
        if fl < 1e-4 && fr < 1e-4 {
            return BounceKind::Reflect;
        }
        if rng.uniform_float() <= fl / (fl + fr) {
            BounceKind::Reflect
        } else {
            BounceKind::Refract
        }
    }
}
