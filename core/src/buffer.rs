//! Sample buffers and impulse response tracks.

use crate::base::{Float, SAMPLE_RATE};
use std::ops::{Deref, DerefMut};

/// Initial backing store size, three seconds of audio.
pub const INITIAL_BUFFER_SIZE: usize = 3 * SAMPLE_RATE as usize;

/// Growth increment, one second of audio.
pub const INCREMENTAL_BUFFER_SIZE: usize = SAMPLE_RATE as usize;

/// A dynamically growing array of floating point samples. Writes beyond the
/// current capacity grow the backing store; reads beyond it yield 0. The
/// buffer tracks the smallest written index in `first_sample` and one past
/// the largest in `real_length`, so that whole-buffer operations skip
/// leading and trailing silence.
#[derive(Clone)]
pub struct FloatBuffer {
    data: Vec<Float>,

    /// Smallest index written so far. Starts out past `real_length` and is
    /// only meaningful once a sample has been written.
    pub first_sample: usize,

    /// One past the largest index written so far.
    pub real_length: usize,
}

impl Default for FloatBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatBuffer {
    /// Creates an empty buffer with the initial capacity.
    pub fn new() -> Self {
        Self {
            data: vec![0.0; INITIAL_BUFFER_SIZE],
            first_sample: INITIAL_BUFFER_SIZE - 1,
            real_length: 0,
        }
    }

    /// Returns the capacity of the backing store.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Grows the backing store so index `i` is addressable.
    ///
    /// * `i` - The index to make addressable.
    fn ensure_capacity(&mut self, i: usize) {
        if i >= self.data.len() {
            self.data.resize(i + INCREMENTAL_BUFFER_SIZE, 0.0);
        }
    }

    /// Reads the sample at an index; indices past the capacity read as 0.
    ///
    /// * `i` - The index.
    #[inline]
    pub fn get(&self, i: usize) -> Float {
        self.data.get(i).copied().unwrap_or(0.0)
    }

    /// Accumulates a value into the sample at an index, growing the backing
    /// store when needed and updating the first/last bookkeeping.
    ///
    /// * `i` - The index.
    /// * `v` - The value to add.
    #[inline]
    pub fn add_at(&mut self, i: usize, v: Float) {
        self.ensure_capacity(i);
        self.data[i] += v;
        if i + 1 > self.real_length {
            self.real_length = i + 1;
        }
        if i < self.first_sample {
            self.first_sample = i;
        }
    }

    /// Returns the written samples as a slice, including leading silence.
    pub fn samples(&self) -> &[Float] {
        &self.data[..self.real_length]
    }

    /// Returns the root mean square of the written samples; 0 for an empty
    /// buffer. Leading silence is skipped but the mean is taken over the
    /// full written length.
    pub fn rms(&self) -> Float {
        if self.real_length == 0 {
            return 0.0;
        }
        let mut x = 0.0;
        for i in self.first_sample..self.real_length {
            x += self.data[i] * self.data[i];
        }
        (x / self.real_length as Float).sqrt()
    }

    /// Returns the largest absolute sample value.
    pub fn maximum(&self) -> Float {
        let mut x = 0.0;
        for i in self.first_sample..self.real_length {
            let a = self.data[i].abs();
            if a > x {
                x = a;
            }
        }
        x
    }

    /// Multiplies all written samples by a constant factor.
    ///
    /// * `f` - The factor.
    pub fn multiply(&mut self, f: Float) {
        for i in self.first_sample..self.real_length {
            self.data[i] *= f;
        }
    }

    /// Normalizes the written samples. The sample equal to `max` (or to the
    /// buffer maximum when `max` is `None`) is mapped to `m`.
    ///
    /// * `m`   - The resulting maximum value.
    /// * `max` - The value mapped to `m`, or `None` to use the buffer maximum.
    pub fn normalize(&mut self, m: Float, max: Option<Float>) {
        self.multiply(m / max.unwrap_or_else(|| self.maximum()));
    }

    /// Raises each written sample to a power, preserving its sign. The
    /// customary exponent of 0.67 goes back to Stevens' power law.
    ///
    /// * `a` - The exponent.
    pub fn power(&mut self, a: Float) {
        for i in self.first_sample..self.real_length {
            let f = self.data[i].abs().powf(a);
            self.data[i] = if self.data[i] < 0.0 { -f } else { f };
        }
    }

    /// Truncates (or extends) the buffer to this length.
    ///
    /// * `l` - The new length; 0 is treated as 1.
    pub fn truncate(&mut self, l: usize) {
        let l = if l == 0 { 1 } else { l };
        self.ensure_capacity(l);
        self.real_length = l;
    }

    /// Returns the buffer length incorporating a threshold under which
    /// trailing samples are neglected: one past the last sample with
    /// magnitude at least `tresh`, or 0 when no sample qualifies. A negative
    /// threshold returns `real_length` unchanged.
    ///
    /// * `tresh` - The threshold.
    pub fn length(&self, tresh: Float) -> usize {
        if tresh < 0.0 {
            return self.real_length;
        }
        let mut max = None;
        for i in self.first_sample..self.data.len() {
            if self.data[i].abs() >= tresh {
                max = Some(i);
            }
        }
        max.map_or(0, |m| m + 1)
    }
}

/// A single impulse response channel of a listener. The main use of this
/// type is convolving dry signals with the response it stores.
#[derive(Clone, Default)]
pub struct RecorderTrack(FloatBuffer);

impl Deref for RecorderTrack {
    type Target = FloatBuffer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RecorderTrack {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl RecorderTrack {
    /// Creates an empty track.
    pub fn new() -> Self {
        Self(FloatBuffer::new())
    }

    /// Convolves a dry signal with this response, yielding a new track. The
    /// response is shifted by the dry signal's sample offset.
    ///
    /// * `dry`    - The dry samples.
    /// * `offset` - Output offset of the dry signal in samples.
    pub fn convolve(&self, dry: &[Float], offset: usize) -> RecorderTrack {
        let mut result = RecorderTrack::new();
        for (i, &sfs) in dry.iter().enumerate() {
            let mut index = i + offset + self.first_sample;
            for j in self.first_sample..self.real_length {
                result.add_at(index, sfs * self.get(j));
                index += 1;
            }
        }
        result
    }

    /// Convolves a dry signal with a response that is linearly interpolated
    /// from this track to another over the length of the dry signal,
    /// suggesting the perception of movement from one location to the other.
    ///
    /// * `other`  - The response at the next keyframe.
    /// * `dry`    - The dry samples.
    /// * `offset` - Output offset of the dry signal in samples.
    pub fn convolve_blend(
        &self,
        other: &RecorderTrack,
        dry: &[Float],
        offset: usize,
    ) -> RecorderTrack {
        let mut result = RecorderTrack::new();
        let inv_samples = 1.0 / dry.len() as Float;
        let len = self.real_length.max(other.real_length);
        let first = self.first_sample.min(other.first_sample);
        for (i, &sfs) in dry.iter().enumerate() {
            let i1 = i as Float * inv_samples;
            let i2 = 1.0 - i1;
            let mut index = i + offset + first;
            for j in first..len {
                let p = i2 * self.get(j) + i1 * other.get(j);
                result.add_at(index, sfs * p);
                index += 1;
            }
        }
        result
    }

    /// Linearly adds the data from the other track to this one.
    ///
    /// * `other` - The other track.
    pub fn add(&mut self, other: &RecorderTrack) {
        for i in 0..other.length(0.0) {
            self.add_at(i, other.get(i));
        }
    }

    /// Returns the T60 reverberation time in seconds: the time reflections
    /// of a direct sound take to decay 60 dB below the level of the direct
    /// sound. The end of the direct lobe is located at the first strict
    /// decrement, which makes the estimate approximate; the direct sound
    /// may not even be present in this track.
    pub fn t60(&self) -> Float {
        let attenuation_gain = (10.0 as Float).powf(60.0 / 20.0);

        let mut min_gain = 0.0;
        let mut last_significant_offset = 0_i64;
        let mut direct_sound_offset = 0_i64;

        let mut previous_sample = -1.0;
        let mut inside_indirect_lobe = false;
        for j in self.first_sample..self.real_length {
            let sample = self.get(j);
            if inside_indirect_lobe {
                if sample > min_gain {
                    last_significant_offset = j as i64;
                }
            } else if sample < previous_sample {
                inside_indirect_lobe = true;
                min_gain = previous_sample / attenuation_gain;
                direct_sound_offset = j as i64;
            }
            previous_sample = sample;
        }

        (last_significant_offset - direct_sound_offset) as Float / SAMPLE_RATE as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn writes_preserve_the_bookkeeping_invariant(
            indices in proptest::collection::vec(0usize..200_000, 1..20)
        ) {
            let mut b = FloatBuffer::new();
            for &i in &indices {
                b.add_at(i, 1.0);
            }
            prop_assert!(b.first_sample <= b.real_length);
            prop_assert!(b.real_length <= b.capacity());
            prop_assert_eq!(b.first_sample, *indices.iter().min().unwrap());
            prop_assert_eq!(b.real_length, *indices.iter().max().unwrap() + 1);
        }
    }

    #[test]
    fn tracks_first_and_last_written_index() {
        let mut b = FloatBuffer::new();
        b.add_at(100, 0.5);
        b.add_at(40, 0.25);
        assert_eq!(b.first_sample, 40);
        assert_eq!(b.real_length, 101);
        assert!(b.first_sample <= b.real_length);
        assert!(b.real_length <= b.capacity());
    }

    #[test]
    fn read_past_capacity_is_zero() {
        let b = FloatBuffer::new();
        assert_eq!(b.get(b.capacity() + 1234), 0.0);
    }

    #[test]
    fn write_past_capacity_grows() {
        let mut b = FloatBuffer::new();
        let i = b.capacity() + 10;
        b.add_at(i, 1.0);
        assert_eq!(b.get(i), 1.0);
        assert_eq!(b.real_length, i + 1);
    }

    #[test]
    fn rms_and_maximum() {
        let mut b = FloatBuffer::new();
        b.add_at(0, 3.0);
        b.add_at(1, -4.0);
        assert_eq!(b.maximum(), 4.0);
        assert!((b.rms() - (25.0f32 / 2.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn normalize_is_idempotent_on_maximum() {
        let mut b = FloatBuffer::new();
        b.add_at(0, 0.25);
        b.add_at(5, -0.75);
        b.normalize(1.0, None);
        assert!((b.maximum() - 1.0).abs() < 1e-6);
        b.normalize(1.0, None);
        assert!((b.maximum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn truncate_clamps_to_one() {
        let mut b = FloatBuffer::new();
        b.truncate(0);
        assert_eq!(b.real_length, 1);
        b.truncate(12);
        assert_eq!(b.real_length, 12);
    }

    #[test]
    fn length_with_threshold() {
        let mut b = FloatBuffer::new();
        b.add_at(3, 0.5);
        b.add_at(9, 0.01);
        assert_eq!(b.length(0.1), 4);
        assert_eq!(b.length(0.001), 10);
        assert_eq!(b.length(2.0), 0);
        assert_eq!(b.length(-1.0), b.real_length);
    }

    #[test]
    fn convolution_against_impulse_reproduces_response() {
        let mut ir = RecorderTrack::new();
        ir.add_at(2, 0.5);
        ir.add_at(3, 0.25);
        let out = ir.convolve(&[1.0], 0);
        assert_eq!(out.get(2), 0.5);
        assert_eq!(out.get(3), 0.25);
    }

    #[test]
    fn convolution_length_is_bounded() {
        let mut ir = RecorderTrack::new();
        ir.add_at(7, 1.0);
        ir.add_at(31, 0.5);
        let dry = vec![0.5; 100];
        let offset = 11;
        let out = ir.convolve(&dry, offset);
        assert!(out.real_length <= ir.real_length + dry.len() + offset + 1);
    }

    #[test]
    fn blend_convolution_fades_between_responses() {
        let mut a = RecorderTrack::new();
        a.add_at(0, 1.0);
        let mut b = RecorderTrack::new();
        b.add_at(0, 3.0);
        // Two-sample dry impulse train: the first sample sees response `a`,
        // the second the midpoint of `a` and `b`.
        let out = a.convolve_blend(&b, &[1.0, 1.0], 0);
        assert!((out.get(0) - 1.0).abs() < 1e-6);
        assert!((out.get(1) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn add_accumulates() {
        let mut a = RecorderTrack::new();
        a.add_at(1, 1.0);
        let mut b = RecorderTrack::new();
        b.add_at(1, 0.5);
        b.add_at(2, 0.25);
        a.add(&b);
        assert_eq!(a.get(1), 1.5);
        assert_eq!(a.get(2), 0.25);
    }

    #[test]
    fn t60_measures_decay_below_direct_peak() {
        let mut t = RecorderTrack::new();
        // Direct peak at sample 10, then a tail whose last sample above
        // peak/1000 sits at sample 10 + 44100.
        t.add_at(10, 1.0);
        t.add_at(11, 0.5);
        t.add_at(10 + 44_100, 0.01);
        t.add_at(10 + 88_200, 0.0001);
        let t60 = t.t60();
        assert!((t60 - 1.0).abs() < 1e-3, "t60 = {t60}");
    }
}
