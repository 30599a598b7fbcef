use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::{CompEngineConfig, ScoringScope};
use super::models::BarRange;
use crate::analyzer::metrics::{self, TakeMetrics};
use crate::take::Take;

/// Timing error at which the timing sub-score bottoms out (audibly late/early).
pub const TIMING_CEILING_MS: f64 = 50.0;

/// SNR (dB) at or above which the quality sub-score is 1.0.
pub const SNR_FULL_SCORE_DB: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingQuality {
    Perfect,
    Good,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    Clean,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippingStatus {
    Clean,
    Detected,
}

/// Descriptor facts behind a score; only `Display` turns them into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReason {
    pub timing: TimingQuality,
    pub signal: SignalQuality,
    pub clipping: ClippingStatus,
}

impl fmt::Display for ScoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        match self.timing {
            TimingQuality::Perfect => parts.push("Perfect timing"),
            TimingQuality::Good => parts.push("Good timing"),
            TimingQuality::Other => {}
        }
        if self.signal == SignalQuality::Clean {
            parts.push("Clean signal");
        }
        parts.push(match self.clipping {
            ClippingStatus::Clean => "No clipping",
            ClippingStatus::Detected => "Clipping detected",
        });

        if parts.is_empty() {
            f.write_str("Acceptable quality")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Score of one take over one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentScore {
    pub timing: f64,
    pub quality: f64,
    pub clipping: f64,
    /// Weighted sum of the three sub-scores, in 0..=1.
    pub total: f64,
    pub reason: ScoreReason,
    /// Measurements the score was computed from.
    pub metrics: TakeMetrics,
}

/// Score `take` over `segment` under `config`.
///
/// Per-segment analysis only applies to takes whose metrics were measured
/// from their own samples; supplied metrics are always used as given.
/// Clipping anywhere in the take rules it out of every segment.
///
/// Pure: the same inputs always give a bit-identical result.
pub fn score_segment(take: &Take, segment: &BarRange, config: &CompEngineConfig) -> SegmentScore {
    let m = match config.scoring_scope {
        ScoringScope::PerSegment if take.has_measured_metrics() => {
            let mut m = segment_metrics(take, segment, config);
            m.peak_db = m.peak_db.max(take.metrics().peak_db);
            m
        }
        _ => *take.metrics(),
    };
    score_metrics(&m, config)
}

/// Combine metrics into a weighted score.
pub fn score_metrics(m: &TakeMetrics, config: &CompEngineConfig) -> SegmentScore {
    let timing = timing_subscore(m.timing_error_ms);
    let quality = quality_subscore(m.snr);
    let clipping = if m.peak_db <= config.clipping_threshold_db {
        1.0
    } else {
        0.0
    };

    let total = timing * config.timing_weight
        + quality * config.quality_weight
        + clipping * config.clipping_weight;

    let reason = ScoreReason {
        timing: if timing > 0.9 {
            TimingQuality::Perfect
        } else if timing > 0.7 {
            TimingQuality::Good
        } else {
            TimingQuality::Other
        },
        signal: if quality > 0.8 {
            SignalQuality::Clean
        } else {
            SignalQuality::Other
        },
        clipping: if clipping > 0.0 {
            ClippingStatus::Clean
        } else {
            ClippingStatus::Detected
        },
    };

    SegmentScore {
        timing,
        quality,
        clipping,
        total,
        reason,
        metrics: *m,
    }
}

fn timing_subscore(timing_error_ms: f64) -> f64 {
    (1.0 - timing_error_ms.min(TIMING_CEILING_MS) / TIMING_CEILING_MS).max(0.0)
}

fn quality_subscore(snr: f64) -> f64 {
    (snr / SNR_FULL_SCORE_DB).clamp(0.0, 1.0)
}

/// Metrics of the take's audio inside `segment`, or the take-level metrics
/// when the take has no samples there.
fn segment_metrics(take: &Take, segment: &BarRange, config: &CompEngineConfig) -> TakeMetrics {
    let samples = take.samples();
    let tempo = take.tempo_bpm();
    if !tempo.is_finite() || tempo <= 0.0 {
        return *take.metrics();
    }
    let frames_per_bar = config.time_signature.seconds_per_bar(tempo) * samples.sample_rate() as f64;
    let to_frame = |bar: f64| {
        let f = ((bar - take.start_bar()) * frames_per_bar).round();
        f.clamp(0.0, samples.frames() as f64) as usize
    };
    let start = to_frame(segment.start);
    let end = to_frame(segment.end);
    if start >= end {
        return *take.metrics();
    }

    match metrics::extract_metrics_range(samples, start..end, tempo) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("Segment analysis failed for take {}: {}", take.id(), e);
            *take.metrics()
        }
    }
}
