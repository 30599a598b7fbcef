use std::ops::Range;

use super::CompError;
use super::models::{CompResult, CompSegment, Crossfade, TimeSignature};
use crate::audio::SampleBuffer;
use crate::take::Take;

/// Output channel count of every render.
pub const OUTPUT_CHANNELS: usize = 2;

/// Render `plan` into a new stereo buffer at `sample_rate`.
///
/// Segments whose take is missing from `takes` are skipped (left silent).
/// Each take switch is smoothed by the crossfade registered at that bar.
pub fn render(
    takes: &[Take],
    plan: &CompResult,
    bpm: f64,
    sample_rate: u32,
    time_signature: TimeSignature,
) -> Result<SampleBuffer, CompError> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(CompError::InvalidTempo(bpm));
    }
    let Some(span) = plan.span() else {
        return Ok(SampleBuffer::silent_stereo(0, sample_rate)?);
    };

    let seconds_per_bar = time_signature.seconds_per_bar(bpm);
    let frames_per_bar = seconds_per_bar * sample_rate as f64;
    let total = (span.len() * frames_per_bar).round() as usize;
    let mut out = SampleBuffer::silent_stereo(total, sample_rate)?;

    let to_dest = |bar: f64| {
        (((bar - span.start) * frames_per_bar).round().max(0.0) as usize).min(total)
    };
    let find_take = |id: &str| takes.iter().find(|t| t.id() == id);

    log::debug!(
        "Rendering {} segments ({} frames at {} Hz, {} BPM)",
        plan.segments.len(),
        total,
        sample_rate,
        bpm
    );

    for (i, segment) in plan.segments.iter().enumerate() {
        let Some(take) = find_take(&segment.take_id) else {
            log::warn!(
                "Take {} not found; leaving bars {:.2}-{:.2} silent",
                segment.take_id,
                segment.start_bar,
                segment.end_bar
            );
            continue;
        };
        if take.samples().sample_rate() != sample_rate {
            log::warn!(
                "Take {} is {} Hz, engine is {} Hz; copying without resampling",
                take.id(),
                take.samples().sample_rate(),
                sample_rate
            );
        }

        let dest = to_dest(segment.start_bar)..to_dest(segment.end_bar);
        let src_start = source_offset(take, segment, seconds_per_bar);
        copy_segment(&mut out, take, dest.clone(), src_start);

        let Some(next) = plan.segments.get(i + 1) else {
            continue;
        };
        if next.take_id == segment.take_id {
            continue;
        }
        let (Some(crossfade), Some(incoming)) =
            (plan.crossfade_at(next.start_bar), find_take(&next.take_id))
        else {
            continue;
        };
        let boundary = to_dest(next.start_bar);
        apply_crossfade(
            &mut out,
            incoming,
            crossfade,
            dest.start..boundary,
            source_offset(incoming, next, seconds_per_bar),
        );
    }

    Ok(out)
}

/// Source frame in `take` that lines up with the start of `segment`.
fn source_offset(take: &Take, segment: &CompSegment, seconds_per_bar: f64) -> i64 {
    let rate = take.samples().sample_rate() as f64;
    ((segment.start_bar - take.start_bar()) * seconds_per_bar * rate).round() as i64
}

/// Copy `take` into `dest`, reading from `src_start` onward. Frames outside
/// the take are skipped; mono sources feed both output channels.
fn copy_segment(out: &mut SampleBuffer, take: &Take, dest: Range<usize>, src_start: i64) {
    let src = take.samples();
    let src_frames = src.frames() as i64;
    let dest = dest.start.min(out.frames())..dest.end.min(out.frames());

    for ch in 0..OUTPUT_CHANNELS {
        let src_ch = src.channel(ch.min(src.num_channels() - 1));
        let dst = out.channel_mut(ch);
        for (j, d) in dest.clone().enumerate() {
            let s = src_start + j as i64;
            if s < 0 || s >= src_frames {
                continue;
            }
            dst[d] = src_ch[s as usize];
        }
    }
}

/// Blend the incoming take over the frames just before the boundary.
///
/// The fade covers the `N` frames ending at `outgoing.end` (never earlier than
/// `outgoing.start`). The incoming take is read on its own timeline, so the
/// frame at `boundary - k` takes incoming source frame `incoming_src - k`;
/// at the boundary the incoming gain has reached 1 and the plain copy of the
/// next segment carries on from there.
fn apply_crossfade(
    out: &mut SampleBuffer,
    incoming: &Take,
    crossfade: &Crossfade,
    outgoing: Range<usize>,
    incoming_src: i64,
) {
    let sample_rate = out.sample_rate() as f64;
    let requested = (crossfade.duration_ms / 1000.0 * sample_rate).round() as usize;
    let boundary = outgoing.end;
    let n = requested.min(boundary.saturating_sub(outgoing.start));
    if n == 0 {
        return;
    }
    let fade_start = boundary - n;

    let src = incoming.samples();
    let src_frames = src.frames() as i64;
    for ch in 0..OUTPUT_CHANNELS {
        let src_ch = src.channel(ch.min(src.num_channels() - 1));
        let dst = out.channel_mut(ch);
        for i in 0..n {
            let d = fade_start + i;
            if d >= dst.len() {
                break;
            }
            let s = incoming_src - n as i64 + i as i64;
            if s < 0 || s >= src_frames {
                continue;
            }
            let t = i as f64 / n as f64;
            let (gain_out, gain_in) = crossfade.kind.gains(t);
            dst[d] = (dst[d] as f64 * gain_out + src_ch[s as usize] as f64 * gain_in) as f32;
        }
    }
}
