//! Work items for the two parallel phases.

use aural_core::base::Float;
use aural_core::buffer::RecorderTrack;
use aural_core::listener::Listener;
use aural_core::scene::Scene;
use aural_core::source::BandView;

/// Everything one render task needs: the tuple it renders (source,
/// keyframe, band), its sampling parameters and its own blank listener
/// copies to record into.
pub struct SceneContext {
    /// Frequency band.
    pub band: usize,

    /// Index of the sound source.
    pub source_id: usize,

    /// Keyframe index, or `None` for static scenes.
    pub keyframe: Option<usize>,

    /// Monte Carlo path count.
    pub samples: usize,

    /// Per-meter air attenuation factor, `1 - absorption[band]`.
    pub absorption_factor: Float,

    /// Scalar on the direct-sound lobe.
    pub dry_level: Float,

    /// RNG seed for this task.
    pub seed: u64,

    /// Blank listener copies, one per scene listener, in scene order.
    pub recorders: Vec<Listener>,
}

impl SceneContext {
    /// Creates a render task, cloning a blank recorder per scene listener.
    ///
    /// * `scene`             - The scene.
    /// * `band`              - Frequency band.
    /// * `source_id`         - Index of the sound source.
    /// * `samples`           - Monte Carlo path count.
    /// * `absorption_factor` - Per-meter air attenuation factor.
    /// * `dry_level`         - Scalar on the direct-sound lobe.
    /// * `keyframe`          - Keyframe index, or `None`.
    /// * `seed`              - RNG seed for this task.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scene: &Scene,
        band: usize,
        source_id: usize,
        samples: usize,
        absorption_factor: Float,
        dry_level: Float,
        keyframe: Option<usize>,
        seed: u64,
    ) -> Self {
        Self {
            band,
            source_id,
            keyframe,
            samples,
            absorption_factor,
            dry_level,
            seed,
            recorders: scene.listeners.iter().map(Listener::blank_copy).collect(),
        }
    }
}

/// Everything one convolution task needs: the listener whose responses are
/// convolved, the dry band to convolve with, and optionally the responses
/// of the next keyframe to interpolate against.
pub struct RecorderContext<'a> {
    /// The listener carrying the rendered responses; receives the
    /// processed tracks.
    pub listener: &'a mut Listener,

    /// The dry frequency band of the source.
    pub dry: BandView<'a>,

    /// Start of the dry section in seconds.
    pub offset: Float,

    /// Length of the dry section in seconds, `None` for the remainder.
    pub length: Option<Float>,

    /// Response tracks of the next keyframe, for interpolated convolution.
    pub secondary: Option<Vec<RecorderTrack>>,
}
