//! WAV input and output.

use crate::base::{Float, SAMPLE_RATE};
use crate::error::{EngineError, Result};
use std::path::Path;

/// Peak normalization applied when writing.
#[derive(Copy, Clone, Debug)]
pub enum Normalization {
    /// Samples are written as they are.
    Off,

    /// Samples are scaled so the peak lands at 0.8.
    Auto,

    /// Samples are scaled relative to an externally computed peak, landing
    /// it at 0.95. Stereo writers fall back to `Auto`.
    Peak(Float),
}

/// Reads a WAV file into a mono float buffer in [-1, 1]. Multi-channel
/// files are averaged into one channel. Only 8, 16 and 24-bit integer PCM
/// is understood.
///
/// * `path` - The file to read.
pub fn load_mono<P: AsRef<Path>>(path: P) -> Result<Vec<Float>> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int
        || !matches!(spec.bits_per_sample, 8 | 16 | 24)
    {
        return Err(EngineError::Decode(format!(
            "unsupported sample format in '{}'",
            path.display()
        )));
    }

    let max_sample = (1_i64 << (spec.bits_per_sample - 1)) as Float;
    let channels = spec.channels as usize;

    let mut data = Vec::with_capacity(reader.len() as usize / channels);
    let mut frame = 0.0;
    for (i, sample) in reader.samples::<i32>().enumerate() {
        frame += sample? as Float / max_sample;
        if (i + 1) % channels == 0 {
            data.push(frame / channels as Float);
            frame = 0.0;
        }
    }

    if data.is_empty() {
        return Err(EngineError::Decode(format!(
            "no samples in '{}'",
            path.display()
        )));
    }
    Ok(data)
}

fn scale_for(samples: &[Float], norm: Normalization) -> Float {
    match norm {
        Normalization::Off => 1.0,
        Normalization::Auto => samples.iter().copied().fold(-1e9, Float::max) / 0.8,
        Normalization::Peak(max) => max / 0.95,
    }
}

fn quantize(f: Float, max: Float) -> i16 {
    (f / max * 32768.0) as i16
}

/// Writes a mono 16-bit PCM WAV file at the engine sample rate.
///
/// * `path`    - Destination path.
/// * `samples` - The samples.
/// * `norm`    - Peak normalization mode.
pub fn save_mono<P: AsRef<Path>>(path: P, samples: &[Float], norm: Normalization) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let max = scale_for(samples, norm);
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &f in samples {
        writer.write_sample(quantize(f, max))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Writes a stereo 16-bit PCM WAV file at the engine sample rate, padding
/// the shorter channel with silence.
///
/// * `path`  - Destination path.
/// * `left`  - Left channel samples.
/// * `right` - Right channel samples.
/// * `norm`  - Peak normalization mode.
pub fn save_stereo<P: AsRef<Path>>(
    path: P,
    left: &[Float],
    right: &[Float],
    norm: Normalization,
) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let max = match norm {
        Normalization::Off => 1.0,
        _ => {
            let peak = left
                .iter()
                .chain(right.iter())
                .copied()
                .fold(-1e9, Float::max);
            peak / 0.8
        }
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..left.len().max(right.len()) {
        writer.write_sample(left.get(i).map_or(0, |&f| quantize(f, max)))?;
        writer.write_sample(right.get(i).map_or(0, |&f| quantize(f, max)))?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("aural-wav-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn mono_roundtrip_preserves_quantized_samples() {
        let path = temp_path("roundtrip.wav");
        let samples: Vec<Float> = (-8..8).map(|k| k as Float * 1024.0 / 32768.0).collect();
        save_mono(&path, &samples, Normalization::Off).unwrap();
        let loaded = load_mono(&path).unwrap();
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in loaded.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn auto_normalization_scales_peak() {
        let path = temp_path("norm.wav");
        save_mono(&path, &[0.1, 0.4, 0.2], Normalization::Auto).unwrap();
        let loaded = load_mono(&path).unwrap();
        let peak = loaded.iter().copied().fold(0.0, Float::max);
        assert!((peak - 0.8).abs() < 1e-3, "peak = {peak}");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn stereo_pads_shorter_channel() {
        let path = temp_path("stereo.wav");
        save_stereo(&path, &[0.5, 0.5, 0.5], &[0.5], Normalization::Off).unwrap();
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.len(), 6);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_mono("/nonexistent/file.wav").is_err());
    }
}
