//! Direction sampling.
//!
//! The distributions here favour simplicity over efficiency; sphere samples
//! are drawn by rejection from the unit cube and hemisphere samples by
//! rejection from the sphere.

use crate::base::Float;
use crate::geometry::Vector3f;
use crate::rng::Rng;

/// Samples a direction uniformly on the unit sphere. A point in the cube
/// [-1, 1]³ is drawn and discarded when it falls outside the unit ball or
/// too close to the origin to normalize reliably.
///
/// * `rng` - Random number generator.
pub fn uniform_sphere(rng: &mut Rng) -> Vector3f {
    loop {
        let v = Vector3f::new(
            rng.symmetric_float(),
            rng.symmetric_float(),
            rng.symmetric_float(),
        );
        let l = v.length_squared();
        if (0.001..=1.0).contains(&l) {
            return v / l.sqrt();
        }
    }
}

/// Samples a direction uniformly on the hemisphere around a normal, by
/// sampling the sphere and retrying when the sample opposes the normal.
///
/// * `rng` - Random number generator.
/// * `n`   - The hemisphere axis.
pub fn uniform_hemisphere(rng: &mut Rng, n: &Vector3f) -> Vector3f {
    loop {
        let v = uniform_sphere(rng);
        if n.dot(&v) >= 0.0 {
            return v;
        }
    }
}

/// Samples the hemisphere around a normal and blends the result toward a
/// preferred direction, modelling the specular component of a bounce. A
/// factor of 0 yields a purely diffuse sample, a factor of 1 the preferred
/// direction itself.
///
/// * `rng`       - Random number generator.
/// * `n`         - The hemisphere axis.
/// * `preferred` - Direction to blend toward, e.g. the mirror reflection.
/// * `factor`    - Specularity in [0, 1].
pub fn biased_hemisphere(
    rng: &mut Rng,
    n: &Vector3f,
    preferred: &Vector3f,
    factor: Float,
) -> Vector3f {
    let v = uniform_hemisphere(rng, n);
    (v * (1.0 - factor) + *preferred * factor).normalize()
}
