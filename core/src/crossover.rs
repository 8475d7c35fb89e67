//! 4th-order Linkwitz-Riley 3-way crossover.
//!
//! Adapted from the classic musicdsp.org filter collection. The two
//! crossover points are the midpoints of the three configured band
//! frequencies; each pass is a 4th-order IIR section with
//! Butterworth-squared coefficients, so the summed outputs stay flat.

use crate::base::{Float, NUM_BANDS, SAMPLE_RATE};

// The legacy coefficient derivation uses this approximation of π; kept so
// the filter responses match the reference output bit for bit.
const LR_PI: Float = 3.14285714285714;

/// One 4th-order IIR pass with its 4-tap delay lines.
struct Pass {
    a0: Float,
    a1: Float,
    a2: Float,
    a3: Float,
    a4: Float,
    b1: Float,
    b2: Float,
    b3: Float,
    b4: Float,
    xm: [Float; 4],
    ym: [Float; 4],
}

/// Shared part of the low-pass/high-pass coefficient derivation.
struct Prototype {
    wc4: Float,
    k4: Float,
    a_tmp: Float,
    b: [Float; 4],
}

impl Prototype {
    fn new(fc: Float) -> Self {
        let srate = SAMPLE_RATE as Float;

        let wc = 2.0 * LR_PI * srate;
        let wc2 = wc * wc;
        let wc3 = wc2 * wc;
        let wc4 = wc2 * wc2;
        let k = wc / (LR_PI * fc / srate).tan();
        let k2 = k * k;
        let k3 = k2 * k;
        let k4 = k2 * k2;
        let sqrt2 = (2.0 as Float).sqrt();
        let sq_tmp1 = sqrt2 * wc3 * k;
        let sq_tmp2 = sqrt2 * wc * k3;
        let a_tmp = 4.0 * wc2 * k2 + 2.0 * sq_tmp1 + k4 + 2.0 * sq_tmp2 + wc4;

        let b = [
            (4.0 * (wc4 + sq_tmp1 - k4 - sq_tmp2)) / a_tmp,
            (6.0 * wc4 - 8.0 * wc2 * k2 + 6.0 * k4) / a_tmp,
            (4.0 * (wc4 - sq_tmp1 + sq_tmp2 - k4)) / a_tmp,
            (k4 - 2.0 * sq_tmp1 + wc4 - 2.0 * sq_tmp2 + 4.0 * wc2 * k2) / a_tmp,
        ];

        Self { wc4, k4, a_tmp, b }
    }
}

impl Pass {
    fn low(fc: Float) -> Self {
        let p = Prototype::new(fc);
        let a0 = p.wc4 / p.a_tmp;
        let a1 = 4.0 * p.wc4 / p.a_tmp;
        let a2 = 6.0 * p.wc4 / p.a_tmp;
        Self::from_coefficients(a0, a1, a2, p.b)
    }

    fn high(fc: Float) -> Self {
        let p = Prototype::new(fc);
        let a0 = p.k4 / p.a_tmp;
        let a1 = -4.0 * p.k4 / p.a_tmp;
        let a2 = 6.0 * p.k4 / p.a_tmp;
        Self::from_coefficients(a0, a1, a2, p.b)
    }

    fn from_coefficients(a0: Float, a1: Float, a2: Float, b: [Float; 4]) -> Self {
        Self {
            a0,
            a1,
            a2,
            a3: a1,
            a4: a0,
            b1: b[0],
            b2: b[1],
            b3: b[2],
            b4: b[3],
            xm: [0.0; 4],
            ym: [0.0; 4],
        }
    }

    fn process(&mut self, input: Float) -> Float {
        let out = self.a0 * input
            + self.a1 * self.xm[0]
            + self.a2 * self.xm[1]
            + self.a3 * self.xm[2]
            + self.a4 * self.xm[3]
            - self.b1 * self.ym[0]
            - self.b2 * self.ym[1]
            - self.b3 * self.ym[2]
            - self.b4 * self.ym[3];
        self.xm = [input, self.xm[0], self.xm[1], self.xm[2]];
        self.ym = [out, self.ym[0], self.ym[1], self.ym[2]];
        out
    }
}

/// Splits a mono buffer into low, mid and high bands. The crossover points
/// sit halfway between the band frequencies.
///
/// * `data` - The mono samples.
/// * `f1`   - Low band frequency in Hz.
/// * `f2`   - Mid band frequency in Hz.
/// * `f3`   - High band frequency in Hz.
pub fn split(data: &[Float], f1: Float, f2: Float, f3: Float) -> [Vec<Float>; NUM_BANDS] {
    let fc1 = (f1 + f2) / 2.0;
    let fc2 = (f2 + f3) / 2.0;

    let mut hi_pass1 = Pass::high(fc1);
    let mut hi_pass2 = Pass::high(fc2);
    let mut lo_pass1 = Pass::low(fc1);
    let mut lo_pass2 = Pass::low(fc2);

    let mut low = vec![0.0; data.len()];
    let mut mid = vec![0.0; data.len()];
    let mut high = vec![0.0; data.len()];

    for (i, &x) in data.iter().enumerate() {
        high[i] = hi_pass2.process(x);
        low[i] = lo_pass1.process(x);
        mid[i] = hi_pass1.process(lo_pass2.process(x));
    }

    [low, mid, high]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::PI;

    fn sine(freq: Float, seconds: Float) -> Vec<Float> {
        let n = (seconds * SAMPLE_RATE as Float) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as Float / SAMPLE_RATE as Float).sin())
            .collect()
    }

    fn rms(data: &[Float]) -> Float {
        (data.iter().map(|s| s * s).sum::<Float>() / data.len() as Float).sqrt()
    }

    #[test]
    fn mid_band_tone_lands_in_the_mid_band() {
        // Crossover points sit at 1.15 kHz and 9 kHz; 4 kHz is well inside
        // the mid band.
        let signal = sine(4000.0, 1.0);
        let [low, mid, high] = split(&signal, 300.0, 2000.0, 16000.0);
        let total = rms(&signal);
        assert!(rms(&mid) > 0.9 * total, "mid rms {}", rms(&mid));
        assert!(rms(&low) < 0.05 * total, "low rms {}", rms(&low));
        assert!(rms(&high) < 0.05 * total, "high rms {}", rms(&high));
    }

    #[test]
    fn fifty_hertz_lands_in_the_low_band() {
        let signal = sine(50.0, 0.5);
        let [low, mid, high] = split(&signal, 300.0, 2000.0, 16000.0);
        assert!(rms(&low) > 0.9 * rms(&signal));
        assert!(rms(&mid) < 0.1 * rms(&signal));
        assert!(rms(&high) < 0.05 * rms(&signal));
    }

    #[test]
    fn band_lengths_match_the_input() {
        let [low, mid, high] = split(&[0.0; 123], 300.0, 2000.0, 16000.0);
        assert_eq!(low.len(), 123);
        assert_eq!(mid.len(), 123);
        assert_eq!(high.len(), 123);
    }
}
