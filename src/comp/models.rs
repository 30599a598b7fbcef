use std::fmt;

use serde::{Deserialize, Serialize};

use super::scoring::ScoreReason;

/// Bar meter used to convert bars to time.
///
/// The tempo counts the signature's beat unit, so one bar lasts
/// `numerator * 60 / bpm` seconds regardless of the denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const COMMON: TimeSignature = TimeSignature {
        numerator: 4,
        denominator: 4,
    };

    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn beats_per_bar(&self) -> f64 {
        self.numerator as f64
    }

    pub fn seconds_per_bar(&self, bpm: f64) -> f64 {
        (60.0 / bpm) * self.beats_per_bar()
    }

    pub fn bars_for_beats(&self, beats: f64) -> f64 {
        beats / self.beats_per_bar()
    }

    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0 && self.denominator.is_power_of_two()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Half-open region `[start, end)` in bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRange {
    pub start: f64,
    pub end: f64,
}

impl BarRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Why a segment ended up with its take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionReason {
    Scored(ScoreReason),
    OnlyTake,
    Manual,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scored(reason) => reason.fmt(f),
            Self::OnlyTake => f.write_str("Only take available"),
            Self::Manual => f.write_str("Manual selection"),
        }
    }
}

/// One (bar range, source take) assignment in a comp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompSegment {
    pub take_id: String,
    pub start_bar: f64,
    pub end_bar: f64,
    /// Desirability in 0..=1.
    pub score: f64,
    pub reason: SelectionReason,
}

/// A caller-chosen segment for manual comping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualSegment {
    pub take_id: String,
    pub start_bar: f64,
    pub end_bar: f64,
}

impl ManualSegment {
    pub fn new(take_id: impl Into<String>, start_bar: f64, end_bar: f64) -> Self {
        Self {
            take_id: take_id.into(),
            start_bar,
            end_bar,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossfadeType {
    #[default]
    EqualPower,
    Linear,
}

impl CrossfadeType {
    /// (fade-out, fade-in) gains at progress `t` in `[0, 1)`.
    pub fn gains(&self, t: f64) -> (f64, f64) {
        match self {
            Self::EqualPower => {
                let angle = t * std::f64::consts::FRAC_PI_2;
                (angle.cos(), angle.sin())
            }
            Self::Linear => (1.0 - t, t),
        }
    }
}

/// Transition at the start of an incoming segment whose take differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crossfade {
    pub bar: f64,
    pub duration_ms: f64,
    #[serde(rename = "type")]
    pub kind: CrossfadeType,
}

/// A planned comp: ordered segments plus the crossfades between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompResult {
    /// Id of the virtual track the comp renders to.
    pub id: String,
    pub segments: Vec<CompSegment>,
    pub crossfades: Vec<Crossfade>,
    pub segment_count: usize,
    pub average_score: f64,
}

impl CompResult {
    /// The crossfade registered at `bar`, if any.
    pub fn crossfade_at(&self, bar: f64) -> Option<&Crossfade> {
        self.crossfades.iter().find(|x| (x.bar - bar).abs() < 1e-6)
    }

    /// Bar span from the first segment's start to the last segment's end.
    pub fn span(&self) -> Option<BarRange> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(BarRange::new(first.start_bar, last.end_bar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_time_bar_length() {
        let ts = TimeSignature::default();
        assert!((ts.seconds_per_bar(120.0) - 2.0).abs() < 1e-12);
        assert!((ts.bars_for_beats(4.0) - 1.0).abs() < 1e-12);
        assert_eq!(ts.to_string(), "4/4");
    }

    #[test]
    fn test_three_four_bar_length() {
        let ts = TimeSignature::new(3, 4);
        assert!((ts.seconds_per_bar(120.0) - 1.5).abs() < 1e-12);
        assert!((ts.bars_for_beats(3.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_signature_validity() {
        assert!(TimeSignature::new(7, 8).is_valid());
        assert!(!TimeSignature::new(0, 4).is_valid());
        assert!(!TimeSignature::new(4, 3).is_valid());
    }

    #[test]
    fn test_equal_power_gains_keep_power() {
        for i in 0..100 {
            let t = i as f64 / 100.0;
            let (out, inc) = CrossfadeType::EqualPower.gains(t);
            assert!((out * out + inc * inc - 1.0).abs() < 1e-12, "t={t}");
        }
        assert_eq!(CrossfadeType::Linear.gains(0.25), (0.75, 0.25));
    }

    #[test]
    fn test_reason_text() {
        assert_eq!(SelectionReason::OnlyTake.to_string(), "Only take available");
        assert_eq!(SelectionReason::Manual.to_string(), "Manual selection");
    }

    #[test]
    fn test_crossfade_lookup_tolerates_rounding() {
        let plan = CompResult {
            id: "c".into(),
            segments: Vec::new(),
            crossfades: vec![Crossfade {
                bar: 3.0,
                duration_ms: 20.0,
                kind: CrossfadeType::EqualPower,
            }],
            segment_count: 0,
            average_score: 0.0,
        };
        assert!(plan.crossfade_at(3.0 + 1e-9).is_some());
        assert!(plan.crossfade_at(4.0).is_none());
        assert!(plan.span().is_none());
    }
}
