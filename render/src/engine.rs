//! End-to-end render orchestration.

use crate::context::{RecorderContext, SceneContext};
use crate::path;
use crate::processor;
use crate::scheduler::{create_progress_reporter, Pool};
use aural_core::base::{max, Float, BAND_NAMES, NUM_BANDS};
use aural_core::buffer::RecorderTrack;
use aural_core::error::{EngineError, Result};
use aural_core::wav::{self, Normalization};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Exponent compressing rendered responses ahead of truncation, after
/// Stevens' power law.
const RESPONSE_POWER: Float = 0.335;

/// The reverberation time of a scene, measured from the rendered response
/// and predicted by the two classic statistical formulas.
#[derive(Copy, Clone, Debug)]
pub struct T60Report {
    /// Measured from the rendered impulse response.
    pub ear: Float,

    /// Sabine: `0.1611 V / A`.
    pub sabine: Float,

    /// Norris-Eyring: `-0.1611 V / (S ln(1 - a))`.
    pub eyring: Float,
}

/// Renders a scene file end to end and writes every listener's output WAV.
///
/// * `path` - The scene container file.
pub fn render(path: &str) -> Result<()> {
    run(path, false).map(|_| ())
}

/// Runs the reduced render (mid band, first source, first keyframe) and
/// derives the scene's reverberation times.
///
/// * `path` - The scene container file.
pub fn calc_t60(path: &str) -> Result<T60Report> {
    run(path, true)?.ok_or_else(|| {
        EngineError::Decode("scene has no source or listener to measure".to_owned())
    })
}

fn task_seed(base: u64, index: u64) -> u64 {
    base ^ index.wrapping_mul(0x9e3779b97f4a7c15)
}

fn run(path: &str, calc_t60: bool) -> Result<Option<T60Report>> {
    let decoded = aural_decode::decode_file(path)?;
    let (config, scene) = (decoded.config, decoded.scene);
    let keyframes = decoded.keyframes.filter(|k| !k.is_empty());

    let absorption = config.vec3("absorption")?;
    let absorption = [absorption.x, absorption.y, absorption.z];
    let dry_level = config.float("drylevel")?;
    let samples_setting = config.int("samples")?;
    let num_samples = if cfg!(debug_assertions) {
        samples_setting / 1000
    } else {
        samples_setting / 10
    };
    let num_samples = max(0, num_samples) as usize;
    let pool = Pool::from_setting(if config.contains("maxthreads") {
        Some(config.int("maxthreads")?)
    } else {
        None
    });
    let debugdir: Option<PathBuf> = if config.contains("debugdir") {
        Some(config.string("debugdir")?.into())
    } else {
        None
    };

    // Dump the split source bands before anything else touches them; this
    // also materializes every band buffer on the main thread.
    if let Some(dir) = &debugdir {
        for (sf_id, source) in scene.sources.iter().enumerate() {
            for band_id in 0..NUM_BANDS {
                if calc_t60 && band_id != 1 {
                    continue;
                }
                let band = source.band(band_id);
                let name = format!("sound-{sf_id}.band-{band_id}{}.wav", BAND_NAMES[band_id]);
                wav::save_mono(dir.join(name), band.data, Normalization::Off)?;
            }
            if calc_t60 {
                break;
            }
        }
    }

    if scene.mesh.tris.is_empty() {
        warn!("no reflective geometry");
    }

    info!("Rendering...");

    let kf_list: Vec<Option<usize>> = match &keyframes {
        Some(keys) => (0..keys.len()).map(Some).collect(),
        None => vec![None],
    };

    let base_seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    // One render task per (source, keyframe, band); the T60 mode restricts
    // all three axes.
    let mut scs = Vec::new();
    for sound_id in 0..scene.sources.len() {
        for keyframe in &kf_list {
            for band in 0..NUM_BANDS {
                if calc_t60 && band != 1 {
                    continue;
                }
                let absorption_factor = 1.0 - absorption[band];
                scs.push(SceneContext::new(
                    &scene,
                    band,
                    sound_id,
                    num_samples,
                    absorption_factor,
                    dry_level,
                    *keyframe,
                    task_seed(base_seed, scs.len() as u64),
                ));
            }
            if calc_t60 {
                break;
            }
        }
        if calc_t60 {
            break;
        }
    }

    let progress = create_progress_reporter(scs.len() as u64, "Rendering scene");
    {
        let scene = &scene;
        pool.run(&mut scs, &progress, |ctx| path::render(scene, ctx));
    }
    progress.finish();

    // Compress the responses and find the global maximum, then truncate
    // everything below max / 256.
    let mut global_max: Float = 0.0;
    for sc in &mut scs {
        for rec in &mut sc.recorders {
            rec.power(RESPONSE_POWER);
            for track in &rec.tracks {
                let m = track.maximum();
                if m > global_max {
                    global_max = m;
                }
            }
        }
    }
    let treshold = global_max / 256.0;

    for sc in &mut scs {
        for (rec_id, rec) in sc.recorders.iter_mut().enumerate() {
            let len = rec.length(treshold);
            rec.truncate(len);
            if let Some(dir) = &debugdir {
                let kf_id = sc.keyframe.map_or(-1, |k| k as i32);
                let name = format!(
                    "response-{rec_id}.sound-{}.frame-{:02}.band-{}{}.wav",
                    sc.source_id, kf_id, sc.band, BAND_NAMES[sc.band]
                );
                rec.save_to(dir.join(name), Normalization::Peak(global_max))?;
            }
        }
    }

    let noprocess = config.contains("noprocessing") && config.bool("noprocessing")?;
    if noprocess || calc_t60 {
        info!("Not processing data");

        if calc_t60 {
            // The reduced render leaves one context; its first track gives
            // the measured reverberation time, the combined mesh the
            // statistical predictions.
            let rec = match scs.first().and_then(|sc| sc.recorders.first()) {
                Some(rec) => rec,
                None => return Ok(None),
            };
            let ear = rec.tracks[0].t60();
            let v = scene.mesh.volume();
            let a = scene.mesh.total_absorption();
            let s = scene.mesh.area();
            let avg = scene.mesh.average_absorption();
            return Ok(Some(T60Report {
                ear,
                sabine: 0.1611 * v / a,
                eyring: -0.1611 * v / (s * (1.0 - avg).ln()),
            }));
        }
        return Ok(None);
    }

    info!("Processing data...");

    // Convolution plan per render context: the dry section to use and, for
    // every keyframe but the last, the next keyframe's responses to blend
    // toward. Contexts are laid out band-minor, so the same tuple one
    // keyframe later sits NUM_BANDS entries ahead.
    struct Plan {
        offset: Float,
        length: Option<Float>,
        secondaries: Vec<Option<Vec<RecorderTrack>>>,
    }
    let mut plans = Vec::with_capacity(scs.len());
    for (i, sc) in scs.iter().enumerate() {
        let plan = match (&keyframes, sc.keyframe) {
            (Some(keys), Some(kf)) => {
                let offset = keys.keys[kf];
                match keys.segment_length(kf) {
                    Some(length) => {
                        let next = &scs[i + NUM_BANDS];
                        Plan {
                            offset,
                            length: Some(length),
                            secondaries: next
                                .recorders
                                .iter()
                                .map(|r| Some(r.tracks.clone()))
                                .collect(),
                        }
                    }
                    None => Plan {
                        offset,
                        length: None,
                        secondaries: vec![None; sc.recorders.len()],
                    },
                }
            }
            _ => Plan {
                offset: 0.0,
                length: None,
                secondaries: vec![None; sc.recorders.len()],
            },
        };
        plans.push(plan);
    }

    let mut rcs = Vec::new();
    for (sc, plan) in scs.iter_mut().zip(plans) {
        let dry = scene.sources[sc.source_id].band(sc.band);
        for (rec, secondary) in sc.recorders.iter_mut().zip(plan.secondaries) {
            rcs.push(RecorderContext {
                listener: rec,
                dry,
                offset: plan.offset,
                length: plan.length,
                secondary,
            });
        }
    }

    let progress = create_progress_reporter(rcs.len() as u64, "Convolving");
    pool.run(&mut rcs, &progress, |ctx| processor::process(ctx));
    progress.finish();
    drop(rcs);

    info!("Merging result...");

    for (rec_id, listener) in scene.listeners.iter().enumerate() {
        let mut total = listener.blank_copy();
        for sc in &mut scs {
            let other = &mut sc.recorders[rec_id];
            other.save_processed = true;
            if let Some(dir) = &debugdir {
                let kf_id = sc.keyframe.map_or(-1, |k| k as i32);
                let name = format!(
                    "rec-{rec_id}.sound-{}.frame-{:02}.band-{}.wav",
                    sc.source_id, kf_id, sc.band
                );
                other.save_to(dir.join(name), Normalization::Auto)?;
            }
            total.add(other);
        }
        total.save_processed = true;
        total.normalize(0.8);
        let len = total.length(1e-6);
        total.truncate(len);
        total.save()?;
    }

    Ok(None)
}
