//! Random Number Generator.

use crate::base::Float;
use std::time::{SystemTime, UNIX_EPOCH};

/// 1 - epsilon in `Float` precision.
pub const ONE_MINUS_EPSILON: Float = hexf::hexf32!("0x1.fffffep-1"); // 0.99999994

const PCG32_DEFAULT_STATE: u64 = 0x853c49e6748fea9b;
const PCG32_DEFAULT_STREAM: u64 = 0xda3e39cb94b95bdb;
const PCG32_MULT: u64 = 0x5851f42d4c957f2d;

/// Implements the PCG pseudo-random number generator.
#[derive(Clone)]
pub struct Rng {
    state: u64,
    inc: u64,
}

impl Default for Rng {
    /// Return a new instance of `Rng` with default state and stream.
    fn default() -> Self {
        Self {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl Rng {
    /// Create a new `Rng` seeded with the given starting sequence.
    ///
    /// * `sequence_index` - The starting sequence to seed with.
    pub fn new(sequence_index: u64) -> Self {
        let mut ret = Self { state: 0, inc: 0 };
        ret.set_sequence(sequence_index);
        ret
    }

    /// Create a new `Rng` seeded from the system clock at nanosecond
    /// resolution, mixed with a caller-supplied index so that generators
    /// created within the same clock tick still draw distinct sequences.
    ///
    /// * `index` - Caller-supplied stream index, typically a task id.
    pub fn from_entropy(index: u64) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(PCG32_DEFAULT_STATE);
        Self::new(nanos ^ index.wrapping_mul(0x9e3779b97f4a7c15))
    }

    /// Initialize the random number generator sequence.
    ///
    /// * `init_seq` - The starting sequence to seed with.
    #[inline(always)]
    fn set_sequence(&mut self, init_seq: u64) {
        self.state = 0;
        self.inc = init_seq.wrapping_shl(1) | 1;
        let _ = self.uniform_u32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        let _ = self.uniform_u32();
    }

    /// Returns a uniformly distributed u32 value.
    #[inline(always)]
    pub fn uniform_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);

        let xor_shifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xor_shifted.rotate_right(rot)
    }

    /// Returns a uniformly distributed value over the half open interval
    /// [0.0, 1.0).
    pub fn uniform_float(&mut self) -> Float {
        crate::base::min(
            self.uniform_u32() as Float * hexf::hexf32!("0x1.0p-32"),
            ONE_MINUS_EPSILON,
        )
    }

    /// Returns a uniformly distributed value over the closed interval
    /// [-1.0, 1.0].
    pub fn symmetric_float(&mut self) -> Float {
        self.uniform_float() * 2.0 - 1.0
    }

    /// Returns a uniformly distributed value over [0, range).
    ///
    /// * `range` - The upper bound.
    pub fn range_float(&mut self, range: Float) -> Float {
        self.uniform_float() * range
    }
}
