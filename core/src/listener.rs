//! Listeners.

use crate::animation::Track;
use crate::base::{Float, SAMPLE_RATE, SPEED_OF_SOUND};
use crate::buffer::RecorderTrack;
use crate::error::Result;
use crate::geometry::{Point3f, Vector3f};
use crate::wav::{self, Normalization};

/// Distinguishes the listener models. A stereo listener carries a unit
/// vector toward its right ear, driving the interaural time and intensity
/// differences of its two tracks.
#[derive(Clone, Debug)]
pub enum ListenerKind {
    /// Single omnidirectional track.
    Mono,

    /// Two tracks with a dot-product based binaural model.
    Stereo {
        /// Unit vector from the head center toward the right ear.
        right_ear: Track<Vector3f>,
    },
}

/// A listener in the scene: one or two impulse response tracks, a location
/// (possibly animated) and the destination its final mix is written to.
/// Rendering works on blank copies, one per render task, sharing only the
/// location data.
#[derive(Clone)]
pub struct Listener {
    /// Path the final result is written to.
    pub filename: String,

    /// Listener location.
    pub location: Track<Point3f>,

    /// Mono or stereo behaviour.
    pub kind: ListenerKind,

    /// Whether `save` writes the processed tracks or the raw responses.
    pub save_processed: bool,

    /// Whether any ray contribution has been recorded.
    pub has_samples: bool,

    /// Whether processed tracks have been produced.
    pub is_processed: bool,

    /// Whether the response tracks have been truncated.
    pub is_truncated: bool,

    /// The impulse response tracks, one per channel.
    pub tracks: Vec<RecorderTrack>,

    /// The convolved output tracks, filled by the processing phase.
    pub processed_tracks: Vec<RecorderTrack>,
}

/// Head radius expressed as a time offset in seconds.
const HEAD_SIZE: Float = 0.5 / SPEED_OF_SOUND;

impl Listener {
    /// Creates a mono listener.
    ///
    /// * `filename` - Output path.
    /// * `location` - Listener location.
    pub fn mono(filename: String, location: Track<Point3f>) -> Self {
        Self::new(filename, location, ListenerKind::Mono, 1)
    }

    /// Creates a stereo listener.
    ///
    /// * `filename`  - Output path.
    /// * `location`  - Listener location.
    /// * `right_ear` - Unit vector toward the right ear.
    pub fn stereo(filename: String, location: Track<Point3f>, right_ear: Track<Vector3f>) -> Self {
        Self::new(filename, location, ListenerKind::Stereo { right_ear }, 2)
    }

    fn new(filename: String, location: Track<Point3f>, kind: ListenerKind, tracks: usize) -> Self {
        Self {
            filename,
            location,
            kind,
            save_processed: false,
            has_samples: false,
            is_processed: false,
            is_truncated: false,
            tracks: (0..tracks).map(|_| RecorderTrack::new()).collect(),
            processed_tracks: Vec::new(),
        }
    }

    /// Number of tracks, 1 for mono and 2 for stereo.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// The listener location at a keyframe.
    ///
    /// * `kf` - Keyframe index, or `None` for static scenes.
    pub fn location(&self, kf: Option<usize>) -> Point3f {
        self.location.evaluate(kf)
    }

    /// Returns a listener sharing this one's destination, location data and
    /// `save_processed` flag, with fresh empty tracks and cleared state.
    pub fn blank_copy(&self) -> Self {
        let mut copy = Self::new(
            self.filename.clone(),
            self.location.clone(),
            self.kind.clone(),
            self.tracks.len(),
        );
        copy.save_processed = self.save_processed;
        copy
    }

    /// Records a ray contribution. The amplitude is splatted over a window
    /// that widens with the square root of the travelled distance,
    /// approximating the spatial uncertainty that grows with path length.
    /// Non-finite amplitudes are dropped.
    ///
    /// * `dir`  - Unit direction of arrival at the listener.
    /// * `a`    - Contribution intensity.
    /// * `t`    - Arrival time in seconds.
    /// * `dist` - Total travelled distance in meters.
    /// * `band` - Frequency band.
    /// * `kf`   - Keyframe index, or `None` for static scenes.
    pub fn record(
        &mut self,
        dir: &Vector3f,
        a: Float,
        t: Float,
        dist: Float,
        band: usize,
        kf: Option<usize>,
    ) {
        match &self.kind {
            ListenerKind::Mono => self.record_mono(a, t, dist),
            ListenerKind::Stereo { right_ear } => {
                let ear = right_ear.evaluate(kf);
                self.record_stereo(dir, &ear, a, t, dist, band);
            }
        }
    }

    fn record_mono(&mut self, a: Float, t: Float, dist: Float) {
        let s = (t * SAMPLE_RATE as Float) as usize;
        let width = dist.sqrt();
        let w = crate::base::max(1, width.floor() as usize);
        let mut ampl = 2.0 * a / width;
        if !ampl.is_finite() {
            return;
        }
        let step = ampl / w as Float;
        for i in 0..w {
            self.tracks[0].add_at(s + i, ampl);
            ampl -= step;
        }
        self.has_samples = true;
    }

    fn record_stereo(
        &mut self,
        dir: &Vector3f,
        ear: &Vector3f,
        a: Float,
        t: Float,
        dist: Float,
        band: usize,
    ) {
        let dot = dir.dot(ear);

        let s_left = ((t - dot * HEAD_SIZE) * SAMPLE_RATE as Float) as i64;
        let s_right = ((t + dot * HEAD_SIZE) * SAMPLE_RATE as Float) as i64;

        let width = dist.sqrt();
        let ampl = 2.0 * a / width;
        if !ampl.is_finite() {
            return;
        }

        let mut ampl_left = ampl;
        let mut ampl_right = ampl;

        // The far ear is shadowed by the head, progressively more so in the
        // higher bands.
        let intensity_difference = crate::base::min(0.5, dot.abs());
        let factor = (1.0 - intensity_difference).powi(band as i32);
        if dot < 0.0 {
            ampl_left *= factor;
        } else {
            ampl_right *= factor;
        }

        let w = width.ceil() as i64;
        if w == 0 {
            return;
        }
        let step_left = ampl_left / w as Float;
        let step_right = ampl_right / w as Float;

        for i in 0..w {
            if i + s_left >= 0 {
                self.tracks[0].add_at((i + s_left) as usize, ampl_left);
            }
            if i + s_right >= 0 {
                self.tracks[1].add_at((i + s_right) as usize, ampl_right);
            }
            ampl_left -= step_left;
            ampl_right -= step_right;
        }
        self.has_samples = true;
    }

    /// Multiplies all response tracks by a constant factor.
    ///
    /// * `factor` - The factor.
    pub fn multiply(&mut self, factor: Float) {
        for track in &mut self.tracks {
            track.multiply(factor);
        }
    }

    /// Raises all response tracks to a power, preserving signs.
    ///
    /// * `a` - The exponent.
    pub fn power(&mut self, a: Float) {
        for track in &mut self.tracks {
            track.power(a);
        }
    }

    /// Truncates all response tracks to the given length.
    ///
    /// * `len` - The new length.
    pub fn truncate(&mut self, len: usize) {
        self.is_truncated = true;
        for track in &mut self.tracks {
            track.truncate(len);
        }
    }

    /// Returns the maximum track length. A processed listener reports the
    /// full length of its processed tracks; an unprocessed one applies the
    /// threshold to its response tracks. A listener with no data reports 0.
    ///
    /// * `tresh` - Threshold under which trailing samples are neglected.
    pub fn length(&self, tresh: Float) -> usize {
        if !self.is_processed && !self.has_samples {
            return 0;
        }
        if self.is_processed {
            self.processed_tracks
                .iter()
                .map(|t| t.length(-1.0))
                .max()
                .unwrap_or(0)
        } else {
            self.tracks.iter().map(|t| t.length(tresh)).max().unwrap_or(0)
        }
    }

    /// Accumulates another listener's processed tracks into this one,
    /// creating channels as needed.
    ///
    /// * `other` - The listener to accumulate; must have the same channel
    ///             count.
    pub fn add(&mut self, other: &Listener) {
        assert_eq!(self.track_count(), other.track_count());
        for (i, track) in other.processed_tracks.iter().enumerate() {
            if i == self.processed_tracks.len() {
                self.processed_tracks.push(RecorderTrack::new());
            }
            self.processed_tracks[i].add(track);
        }
        self.is_processed = true;
    }

    /// Normalizes the tracks selected by `save_processed` to a shared
    /// maximum of `m`.
    ///
    /// * `m` - The resulting maximum value.
    pub fn normalize(&mut self, m: Float) {
        let tracks = if self.save_processed {
            &mut self.processed_tracks
        } else {
            &mut self.tracks
        };
        let max = tracks.iter().map(|t| t.maximum()).fold(-1e9, Float::max);
        for track in tracks {
            track.normalize(m, Some(max));
        }
    }

    /// Writes the listener to a WAV file. The `save_processed` flag picks
    /// between the convolved output and the raw impulse response.
    ///
    /// * `path` - Destination path.
    /// * `norm` - Peak normalization mode.
    pub fn save_to<P: AsRef<std::path::Path>>(&self, path: P, norm: Normalization) -> Result<()> {
        let tracks = if self.save_processed {
            &self.processed_tracks
        } else {
            &self.tracks
        };
        match self.kind {
            ListenerKind::Mono => wav::save_mono(path, tracks[0].samples(), norm),
            ListenerKind::Stereo { .. } => {
                wav::save_stereo(path, tracks[0].samples(), tracks[1].samples(), norm)
            }
        }
    }

    /// Writes the listener to its own destination file without peak
    /// normalization.
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.filename, Normalization::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_at_origin() -> Listener {
        Listener::mono("out.wav".into(), Track::Fixed(Point3f::origin()))
    }

    fn stereo_at_origin() -> Listener {
        Listener::stereo(
            "out.wav".into(),
            Track::Fixed(Point3f::origin()),
            Track::Fixed(Vector3f::new(1.0, 0.0, 0.0)),
        )
    }

    #[test]
    fn mono_record_writes_triangular_splat() {
        let mut l = mono_at_origin();
        // One meter of travel: splat of width 1 at sample floor(1/343*44100).
        let t = 1.0 / SPEED_OF_SOUND;
        l.record(&Vector3f::new(1.0, 0.0, 0.0), 0.25, t, 1.0, 0, None);
        let s = (t * SAMPLE_RATE as Float) as usize;
        assert_eq!(s, 128);
        assert!((l.tracks[0].get(s) - 0.5).abs() < 1e-6);
        assert!(l.has_samples);
    }

    #[test]
    fn splat_width_grows_with_distance() {
        let mut l = mono_at_origin();
        l.record(&Vector3f::new(1.0, 0.0, 0.0), 1.0, 0.1, 100.0, 0, None);
        let s = (0.1 * SAMPLE_RATE as Float) as usize;
        // Width 10, linearly decaying.
        assert!(l.tracks[0].get(s) > 0.0);
        assert!(l.tracks[0].get(s + 9) > 0.0);
        assert_eq!(l.tracks[0].get(s + 10), 0.0);
        assert!(l.tracks[0].get(s) > l.tracks[0].get(s + 9));
    }

    #[test]
    fn stereo_itd_is_zero_for_perpendicular_arrival() {
        let mut l = stereo_at_origin();
        let t = 10.0 / SPEED_OF_SOUND;
        l.record(&Vector3f::new(0.0, 1.0, 0.0), 1.0, t, 10.0, 0, None);
        let first_left = l.tracks[0].first_sample;
        let first_right = l.tracks[1].first_sample;
        assert!((first_left as i64 - first_right as i64).abs() <= 1);
    }

    #[test]
    fn stereo_itd_and_iid_for_lateral_arrival() {
        let mut l = stereo_at_origin();
        let t = 10.0 / SPEED_OF_SOUND;
        // Sound propagating along the right-ear axis arrives from the left:
        // the left ear leads by the head size each way, and the shadowed
        // right ear is attenuated by (1 - 1/2)^band.
        l.record(&Vector3f::new(1.0, 0.0, 0.0), 1.0, t, 10.0, 2, None);
        let lag = l.tracks[1].first_sample as i64 - l.tracks[0].first_sample as i64;
        let expected = (2.0 * HEAD_SIZE * SAMPLE_RATE as Float) as i64;
        assert!((lag - expected).abs() <= 1, "lag = {lag}");
        let peak_left = l.tracks[0].maximum();
        let peak_right = l.tracks[1].maximum();
        assert!(peak_right < peak_left);
        assert!((peak_right / peak_left - 0.25).abs() < 1e-3);
    }

    #[test]
    fn blank_copy_shares_location_but_not_state() {
        let mut l = mono_at_origin();
        l.save_processed = true;
        l.record(&Vector3f::new(1.0, 0.0, 0.0), 1.0, 0.01, 1.0, 0, None);
        let copy = l.blank_copy();
        assert_eq!(copy.filename, l.filename);
        assert!(copy.save_processed);
        assert!(!copy.has_samples);
        assert_eq!(copy.length(0.0), 0);
    }

    #[test]
    fn add_creates_and_accumulates_processed_tracks() {
        let mut total = mono_at_origin();
        let mut part = mono_at_origin();
        let mut processed = RecorderTrack::new();
        processed.add_at(3, 0.5);
        part.processed_tracks.push(processed);
        part.is_processed = true;
        total.add(&part);
        total.add(&part);
        assert!(total.is_processed);
        assert_eq!(total.processed_tracks[0].get(3), 1.0);
    }
}
