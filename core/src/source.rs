//! Sound sources.

use crate::animation::Track;
use crate::base::{Float, NUM_BANDS, SAMPLE_RATE};
use crate::crossover;
use crate::geometry::{Point3f, Ray};
use crate::mesh::Mesh;
use crate::rng::Rng;
use crate::sampling;
use std::sync::OnceLock;

/// Default crossover frequencies in kHz.
pub const DEFAULT_CROSSOVER: [Float; 3] = [0.3, 2.0, 16.0];

/// Where a source emits from.
#[derive(Clone)]
pub enum SourcePosition {
    /// A point, possibly animated over the keyframes.
    Point(Track<Point3f>),

    /// The surface of a mesh; rays leave from uniformly sampled points on
    /// it, into the hemisphere around the local normal.
    Surface(Mesh),
}

enum SourceData {
    /// One PCM buffer; band buffers are split off on first request.
    Mono {
        data: Vec<Float>,
        bands: OnceLock<[Vec<Float>; NUM_BANDS]>,
    },

    /// Three pre-split PCM buffers read from separate files.
    TripleBand { bands: [Vec<Float>; NUM_BANDS] },
}

/// A non-owning window into one band of a source's PCM data, carrying the
/// output offset the window's samples map to.
#[derive(Copy, Clone)]
pub struct BandView<'a> {
    /// The samples.
    pub data: &'a [Float],

    /// Output offset in samples.
    pub offset: usize,
}

impl<'a> BandView<'a> {
    /// Returns a sub-window starting at `start` seconds, of `length`
    /// seconds (or the remainder when `None`). A start past the end yields
    /// an empty view.
    ///
    /// * `start`  - Window start in seconds.
    /// * `length` - Window length in seconds, `None` for the remainder.
    pub fn section(&self, start: Float, length: Option<Float>) -> BandView<'a> {
        let int_start = (start * SAMPLE_RATE as Float) as usize;
        if int_start >= self.data.len() {
            return BandView {
                data: &[],
                offset: 0,
            };
        }
        let int_length = match length {
            Some(l) => (l * SAMPLE_RATE as Float) as usize,
            None => self.data.len() - int_start,
        };
        let end = (int_start + int_length).min(self.data.len());
        BandView {
            data: &self.data[int_start..end],
            offset: self.offset + int_start,
        }
    }
}

/// A sound source: PCM data, an emission position, a gain and an output
/// offset. Mono sources split their data into three frequency bands through
/// the Linkwitz-Riley crossover on first use; triple-band sources carry
/// their bands as loaded.
pub struct SoundSource {
    /// Where the source emits from.
    pub position: SourcePosition,

    /// Linear gain, applied in power to the rendered responses.
    pub gain: Float,

    /// Output offset in samples.
    pub offset: usize,

    data: SourceData,
    crossover: [Float; 3],
}

impl SoundSource {
    /// Creates a source from one mono PCM buffer.
    ///
    /// * `data`      - PCM samples in [-1, 1].
    /// * `position`  - Emission position.
    /// * `gain`      - Linear gain.
    /// * `offset`    - Output offset in samples.
    /// * `crossover` - The three crossover frequencies in kHz.
    pub fn mono(
        data: Vec<Float>,
        position: SourcePosition,
        gain: Float,
        offset: usize,
        crossover: [Float; 3],
    ) -> Self {
        Self {
            position,
            gain,
            offset,
            data: SourceData::Mono {
                data,
                bands: OnceLock::new(),
            },
            crossover,
        }
    }

    /// Creates a source from three pre-split band buffers. No crossover
    /// filter is applied to them.
    ///
    /// * `bands`    - Low, mid and high band PCM samples.
    /// * `position` - Emission position.
    /// * `gain`     - Linear gain.
    /// * `offset`   - Output offset in samples.
    pub fn triple_band(
        bands: [Vec<Float>; NUM_BANDS],
        position: SourcePosition,
        gain: Float,
        offset: usize,
    ) -> Self {
        Self {
            position,
            gain,
            offset,
            data: SourceData::TripleBand { bands },
            crossover: DEFAULT_CROSSOVER,
        }
    }

    /// Overrides the crossover frequencies. Only meaningful before the
    /// first band request.
    ///
    /// * `crossover` - The three crossover frequencies in kHz.
    pub fn set_crossover(&mut self, crossover: [Float; 3]) {
        self.crossover = crossover;
    }

    /// Returns whether the source emits from a mesh surface.
    pub fn is_surface(&self) -> bool {
        matches!(self.position, SourcePosition::Surface(_))
    }

    /// The source location at a keyframe; `None` for surface emitters.
    ///
    /// * `kf` - Keyframe index, or `None` for static scenes.
    pub fn location(&self, kf: Option<usize>) -> Option<Point3f> {
        match &self.position {
            SourcePosition::Point(track) => Some(track.evaluate(kf)),
            SourcePosition::Surface(_) => None,
        }
    }

    /// Returns a view over one frequency band, splitting the mono data on
    /// the first request.
    ///
    /// * `band` - The band index.
    pub fn band(&self, band: usize) -> BandView<'_> {
        let data = match &self.data {
            SourceData::Mono { data, bands } => {
                let [f1, f2, f3] = self.crossover;
                let split = bands.get_or_init(|| {
                    crossover::split(data, f1 * 1000.0, f2 * 1000.0, f3 * 1000.0)
                });
                &split[band]
            }
            SourceData::TripleBand { bands } => &bands[band],
        };
        BandView {
            data,
            offset: self.offset,
        }
    }

    /// Emits a fresh outgoing ray: uniformly over the unit sphere for point
    /// sources, from a surface sample into the hemisphere around its normal
    /// for mesh emitters.
    ///
    /// * `kf`  - Keyframe index, or `None` for static scenes.
    /// * `rng` - Random number generator.
    pub fn sound_ray(&self, kf: Option<usize>, rng: &mut Rng) -> Ray {
        match &self.position {
            SourcePosition::Surface(mesh) => {
                let (p, n) = mesh.sample_point(rng);
                Ray::new(p, sampling::uniform_hemisphere(rng, &n))
            }
            SourcePosition::Point(track) => {
                Ray::new(track.evaluate(kf), sampling::uniform_sphere(rng))
            }
        }
    }
}
