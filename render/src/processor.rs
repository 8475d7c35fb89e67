//! Impulse response convolution.

use crate::context::RecorderContext;

/// Convolves the dry section with the listener's responses, installing the
/// results as its processed tracks. When the context carries the responses
/// of the next keyframe, the convolution linearly blends toward them over
/// the section, so the listener is heard moving between the two poses.
///
/// * `ctx` - The convolution task.
pub fn process(ctx: &mut RecorderContext) {
    let section = ctx.dry.section(ctx.offset, ctx.length);
    let n_tracks = ctx.listener.tracks.len();

    for track_id in 0..n_tracks {
        let track = &ctx.listener.tracks[track_id];
        let processed = match &ctx.secondary {
            Some(other) => track.convolve_blend(&other[track_id], section.data, section.offset),
            None => track.convolve(section.data, section.offset),
        };
        ctx.listener.processed_tracks.push(processed);
    }
    ctx.listener.is_processed = true;
}
