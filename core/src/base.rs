//! Common

#![allow(dead_code)]

use num_traits::Num;
use std::ops::Neg;

/// Use 32-bit precision for floating point numbers.
pub type Float = f32;

/// Default signed integer to 32-bit.
pub type Int = i32;

/// PI (π)
pub const PI: Float = std::f32::consts::PI;

/// 2*PI (2π)
pub const TWO_PI: Float = PI * 2.0;

/// 4*PI (4π)
pub const FOUR_PI: Float = PI * 4.0;

/// Samples per second, fixed across the whole engine.
pub const SAMPLE_RATE: u32 = 44_100;

/// Speed of sound in air at standard conditions (m/s).
pub const SPEED_OF_SOUND: Float = 343.0;

/// Number of frequency bands (low, mid, high).
pub const NUM_BANDS: usize = 3;

/// Band name suffixes used in debug dump filenames.
pub const BAND_NAMES: [&str; NUM_BANDS] = ["low", "mid", "high"];

/// Inverse surface area of a sphere with radius `r`.
///
/// * `r` - The radius.
#[inline(always)]
pub fn inv_sphere(r: Float) -> Float {
    1.0 / (FOUR_PI * r * r)
}

/// Inverse surface area of a hemisphere with radius `r`.
///
/// * `r` - The radius.
#[inline(always)]
pub fn inv_hemi(r: Float) -> Float {
    2.0 / (FOUR_PI * r * r)
}

/// Returns the absolute value of a number.
///
/// * `n` - The number.
#[inline(always)]
pub fn abs<T>(n: T) -> T
where
    T: Num + Neg<Output = T> + PartialOrd + Copy,
{
    if n < T::zero() {
        -n
    } else {
        n
    }
}

/// Returns the minimum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn min<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a < b {
        a
    } else {
        b
    }
}

/// Returns the maximum of 2 numbers.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn max<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if a > b {
        a
    } else {
        b
    }
}
