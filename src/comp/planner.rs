use rayon::prelude::*;
use uuid::Uuid;

use super::CompError;
use super::config::CompEngineConfig;
use super::models::{BarRange, CompResult, CompSegment, Crossfade, ManualSegment, SelectionReason};
use super::scoring::{self, SegmentScore};
use crate::take::Take;

/// Plan a comp over `region` by picking the best-scoring take per segment.
///
/// A single take short-circuits to one full-region segment. On an exact
/// score tie the earliest take in `takes` wins.
pub fn plan_auto(
    takes: &[Take],
    region: &BarRange,
    config: &CompEngineConfig,
) -> Result<CompResult, CompError> {
    let Some(first) = takes.first() else {
        return Err(CompError::NoTakes);
    };

    if takes.len() == 1 {
        log::debug!("Single take {}; skipping scoring", first.id());
        let segment = CompSegment {
            take_id: first.id().to_string(),
            start_bar: region.start,
            end_bar: region.end,
            score: 1.0,
            reason: SelectionReason::OnlyTake,
        };
        return Ok(build_result(vec![segment], config));
    }

    let ranges = partition(region, config.segment_bars());
    log::debug!(
        "Scoring {} takes over {} segments ({:.3} bars each)",
        takes.len(),
        ranges.len(),
        config.segment_bars()
    );

    // Segments are independent; collect() keeps them in bar order.
    let segments: Vec<CompSegment> = ranges
        .par_iter()
        .map(|range| {
            let (take, score) = select_take(takes, range, config);
            log::trace!(
                "Bars {:.2}-{:.2}: {} ({:.3}, {})",
                range.start,
                range.end,
                take.id(),
                score.total,
                score.reason
            );
            CompSegment {
                take_id: take.id().to_string(),
                start_bar: range.start,
                end_bar: range.end,
                score: score.total,
                reason: SelectionReason::Scored(score.reason),
            }
        })
        .collect();

    Ok(build_result(segments, config))
}

/// Build a comp from caller-chosen segments.
///
/// Segments are taken as given: ordering and overlap are the caller's
/// responsibility and are not checked here.
pub fn plan_manual(takes: &[Take], manual: &[ManualSegment], config: &CompEngineConfig) -> CompResult {
    let segments = manual
        .iter()
        .map(|m| {
            match takes.iter().find(|t| t.id() == m.take_id) {
                None => log::warn!(
                    "Manual segment {:.2}-{:.2} references unknown take {}",
                    m.start_bar,
                    m.end_bar,
                    m.take_id
                ),
                Some(take) if !take.covers(m.start_bar, m.end_bar) => log::warn!(
                    "Manual segment {:.2}-{:.2} is outside take {} (bars {:.2}-{:.2})",
                    m.start_bar,
                    m.end_bar,
                    m.take_id,
                    take.start_bar(),
                    take.end_bar()
                ),
                Some(_) => {}
            }
            CompSegment {
                take_id: m.take_id.clone(),
                start_bar: m.start_bar,
                end_bar: m.end_bar,
                score: 1.0,
                reason: SelectionReason::Manual,
            }
        })
        .collect();
    build_result(segments, config)
}

/// Split `region` into consecutive segments of `size` bars; the last may be shorter.
pub fn partition(region: &BarRange, size: f64) -> Vec<BarRange> {
    if region.is_empty() || size <= 0.0 {
        return Vec::new();
    }
    let count = (region.len() / size - 1e-9).ceil().max(1.0) as usize;
    (0..count)
        .map(|i| {
            let start = region.start + i as f64 * size;
            let end = if i + 1 == count {
                region.end
            } else {
                (start + size).min(region.end)
            };
            BarRange::new(start, end)
        })
        .collect()
}

/// One crossfade per adjacent pair of segments whose takes differ.
pub fn derive_crossfades(segments: &[CompSegment], config: &CompEngineConfig) -> Vec<Crossfade> {
    segments
        .windows(2)
        .filter(|pair| pair[0].take_id != pair[1].take_id)
        .map(|pair| Crossfade {
            bar: pair[1].start_bar,
            duration_ms: config.crossfade_duration_ms,
            kind: config.crossfade_type,
        })
        .collect()
}

/// Highest-scoring take for `range`; only a strictly higher total displaces
/// the current best, so earlier takes win ties.
fn select_take<'a>(
    takes: &'a [Take],
    range: &BarRange,
    config: &CompEngineConfig,
) -> (&'a Take, SegmentScore) {
    let mut best = (&takes[0], scoring::score_segment(&takes[0], range, config));
    for take in &takes[1..] {
        let score = scoring::score_segment(take, range, config);
        if score.total > best.1.total {
            best = (take, score);
        }
    }
    best
}

fn build_result(segments: Vec<CompSegment>, config: &CompEngineConfig) -> CompResult {
    let crossfades = derive_crossfades(&segments, config);
    let average_score = if segments.is_empty() {
        0.0
    } else {
        segments.iter().map(|s| s.score).sum::<f64>() / segments.len() as f64
    };
    CompResult {
        id: Uuid::new_v4().to_string(),
        segment_count: segments.len(),
        segments,
        crossfades,
        average_score,
    }
}
