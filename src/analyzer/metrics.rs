use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::SampleBuffer;

/// Amplitude floor applied before converting to dB (keeps silence finite).
pub const AMPLITUDE_FLOOR: f64 = 1e-10;

/// Normalized amplitude a frame must exceed to count as an onset.
pub const ONSET_THRESHOLD: f32 = 0.1;

/// Fraction of the quietest samples used to estimate the noise floor.
const NOISE_FLOOR_PERCENTILE: f64 = 0.1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Cannot measure an empty buffer")]
    EmptyBuffer,
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),
}

/// Objective quality measurements for one take (or one slice of it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeMetrics {
    pub peak_db: f64,
    pub rms_db: f64,
    /// Peak level minus noise-floor level, in dB.
    pub snr: f64,
    /// Distance from the first transient to the nearest beat, in ms.
    pub timing_error_ms: f64,
}

/// Linear amplitude to dB, floor-clamped so the result is always finite.
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * amplitude.max(AMPLITUDE_FLOOR).log10()
}

/// Measure a whole buffer. See [`extract_metrics_range`].
///
/// Audio already above the onset threshold at frame 0 has its onset at frame 0.
pub fn extract_metrics(buffer: &SampleBuffer, tempo_bpm: f64) -> Result<TakeMetrics, MetricsError> {
    extract_metrics_range(buffer, 0..buffer.frames(), tempo_bpm)
}

/// Measure the frames in `frames` (clamped to the buffer).
///
/// Peak and RMS cover every sample of every channel. The noise floor is the
/// 10th-percentile magnitude. Timing error is measured from the first
/// transient to the beat grid anchored at the start of the range, so a range
/// that begins on a bar line is judged against its own bar's beats.
pub fn extract_metrics_range(
    buffer: &SampleBuffer,
    frames: Range<usize>,
    tempo_bpm: f64,
) -> Result<TakeMetrics, MetricsError> {
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(MetricsError::InvalidTempo(tempo_bpm));
    }
    let end = frames.end.min(buffer.frames());
    let start = frames.start.min(end);
    if start == end {
        return Err(MetricsError::EmptyBuffer);
    }

    let mut peak = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    let mut magnitudes: Vec<f32> = Vec::with_capacity((end - start) * buffer.num_channels());
    for channel in buffer.channels() {
        for &s in &channel[start..end] {
            let m = s.abs();
            peak = peak.max(m as f64);
            sum_sq += (s as f64) * (s as f64);
            magnitudes.push(m);
        }
    }
    let rms = (sum_sq / magnitudes.len() as f64).sqrt();

    let peak_db = amplitude_to_db(peak);
    // RMS <= peak mathematically; the min guards against summation rounding.
    let rms_db = amplitude_to_db(rms).min(peak_db);
    let noise_floor_db = amplitude_to_db(noise_floor(&mut magnitudes) as f64);

    let timing_error_ms = match first_transient(buffer, start, end) {
        Some(frame) => {
            let secs = (frame - start) as f64 / buffer.sample_rate() as f64;
            grid_offset_ms(secs, tempo_bpm)
        }
        None => 0.0,
    };

    Ok(TakeMetrics {
        peak_db,
        rms_db,
        snr: peak_db - noise_floor_db,
        timing_error_ms,
    })
}

/// Magnitude at the 10th percentile of the ascending magnitudes.
fn noise_floor(magnitudes: &mut [f32]) -> f32 {
    let idx = ((magnitudes.len() as f64 * NOISE_FLOOR_PERCENTILE) as usize).min(magnitudes.len() - 1);
    let (_, floor, _) = magnitudes.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    *floor
}

/// First frame above the onset threshold that is louder than the frame before it.
/// Frame magnitude is the loudest channel; the frame before `start` counts as silence.
fn first_transient(buffer: &SampleBuffer, start: usize, end: usize) -> Option<usize> {
    let frame_magnitude = |i: usize| {
        buffer
            .channels()
            .iter()
            .fold(0.0_f32, |acc, c| acc.max(c[i].abs()))
    };

    let mut previous = 0.0_f32;
    for i in start..end {
        let m = frame_magnitude(i);
        if m > ONSET_THRESHOLD && m > previous {
            return Some(i);
        }
        previous = m;
    }
    None
}

/// Absolute distance (ms) from `secs` to the nearest beat at `tempo_bpm`.
fn grid_offset_ms(secs: f64, tempo_bpm: f64) -> f64 {
    let beat = 60.0 / tempo_bpm;
    let nearest = (secs / beat).round() * beat;
    (secs - nearest).abs() * 1000.0
}
