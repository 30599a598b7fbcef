//! Synthetic takes for unit tests.

use crate::analyzer::metrics::TakeMetrics;
use crate::audio::SampleBuffer;
use crate::take::Take;

pub const SR: u32 = 48_000;
pub const BPM: f64 = 120.0;

const TONE_HZ: f64 = 220.0;
const TONE_AMP: f64 = 0.05;
const CLICK_AMP: f64 = 0.6;

pub fn sine(freq: f64, amp: f64, frames: usize, sample_rate: u32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (amp * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
        })
        .collect()
}

/// A quiet sustained tone with one decaying click per beat (4/4).
/// Every click in bar `b` lands `bar_offsets_ms[b]` late.
pub fn click_track(
    bar_offsets_ms: &[f64],
    bpm: f64,
    sample_rate: u32,
    channels: usize,
) -> Vec<Vec<f32>> {
    let frames_per_beat = 60.0 / bpm * sample_rate as f64;
    let total = (bar_offsets_ms.len() as f64 * 4.0 * frames_per_beat).round() as usize;
    let click_len = (0.05 * sample_rate as f64) as usize;
    let decay = 0.005 * sample_rate as f64;

    let mut samples = sine(TONE_HZ, TONE_AMP, total, sample_rate);
    for (bar, offset_ms) in bar_offsets_ms.iter().enumerate() {
        for beat in 0..4 {
            let onset = ((bar * 4 + beat) as f64 * frames_per_beat
                + offset_ms / 1000.0 * sample_rate as f64)
                .round() as usize;
            for n in 0..click_len {
                if let Some(s) = samples.get_mut(onset + n) {
                    *s += (CLICK_AMP * (-(n as f64) / decay).exp()) as f32;
                }
            }
        }
    }
    vec![samples; channels]
}

/// Mono take at 120 BPM starting at bar 0, one bar per offset.
pub fn timed_take(id: &str, pass_index: u32, bar_offsets_ms: &[f64]) -> Take {
    timed_take_at(id, pass_index, 0.0, bar_offsets_ms, 1)
}

pub fn timed_take_at(
    id: &str,
    pass_index: u32,
    start_bar: f64,
    bar_offsets_ms: &[f64],
    channels: usize,
) -> Take {
    let buffer = SampleBuffer::new(click_track(bar_offsets_ms, BPM, SR, channels), SR).unwrap();
    let end_bar = start_bar + bar_offsets_ms.len() as f64;
    Take::new(id, pass_index, start_bar, end_bar, BPM, buffer).unwrap()
}

/// On-time take driven just past full scale (peak ≈ +0.2 dBFS).
pub fn clipping_take(id: &str, pass_index: u32, bars: usize) -> Take {
    let mut channels = click_track(&vec![0.0; bars], BPM, SR, 1);
    for s in channels[0].iter_mut() {
        *s *= 1.7;
    }
    let buffer = SampleBuffer::new(channels, SR).unwrap();
    Take::new(id, pass_index, 0.0, bars as f64, BPM, buffer).unwrap()
}

/// On-time take where only `hot_bar` is driven past full scale.
pub fn hot_bar_take(id: &str, pass_index: u32, bars: usize, hot_bar: usize) -> Take {
    let mut channels = click_track(&vec![0.0; bars], BPM, SR, 1);
    let bar_frames = (4.0 * 60.0 / BPM * SR as f64) as usize;
    for s in channels[0].iter_mut().skip(hot_bar * bar_frames).take(bar_frames) {
        *s *= 1.7;
    }
    let buffer = SampleBuffer::new(channels, SR).unwrap();
    Take::new(id, pass_index, 0.0, bars as f64, BPM, buffer).unwrap()
}

/// Click-track audio wrapped with metrics supplied by the caller.
pub fn supplied_metrics_take(
    id: &str,
    pass_index: u32,
    bar_offsets_ms: &[f64],
    metrics: TakeMetrics,
) -> Take {
    let buffer = SampleBuffer::new(click_track(bar_offsets_ms, BPM, SR, 1), SR).unwrap();
    let end_bar = bar_offsets_ms.len() as f64;
    Take::with_metrics(id, pass_index, 0.0, end_bar, BPM, buffer, metrics)
}

/// Take with no audio and pre-measured metrics, covering bars 0..8.
pub fn metrics_take(id: &str, pass_index: u32, metrics: TakeMetrics) -> Take {
    let buffer = SampleBuffer::mono(Vec::new(), SR).unwrap();
    Take::with_metrics(id, pass_index, 0.0, 8.0, BPM, buffer, metrics)
}

pub fn clean_metrics(timing_error_ms: f64) -> TakeMetrics {
    TakeMetrics {
        peak_db: -6.0,
        rms_db: -18.0,
        snr: 45.0,
        timing_error_ms,
    }
}
