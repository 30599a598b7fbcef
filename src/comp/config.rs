use serde::{Deserialize, Serialize};

use super::CompError;
use super::models::{CrossfadeType, TimeSignature};

/// Allowed deviation of the scoring weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.001;

/// Which audio a segment score is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringScope {
    /// Measure the take's samples inside the segment; fall back to the
    /// take-level metrics when the take has no audio there.
    #[default]
    PerSegment,
    /// Always use the take-level metrics.
    WholeTake,
}

/// Comp engine settings. The three weights must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompEngineConfig {
    /// Segment granularity in beats (4 = one bar of 4/4).
    pub segment_size_beats: f64,
    pub crossfade_duration_ms: f64,
    pub crossfade_type: CrossfadeType,
    pub clipping_threshold_db: f64,
    pub timing_weight: f64,
    pub quality_weight: f64,
    pub clipping_weight: f64,
    pub time_signature: TimeSignature,
    pub scoring_scope: ScoringScope,
}

impl Default for CompEngineConfig {
    fn default() -> Self {
        Self {
            segment_size_beats: 4.0,
            crossfade_duration_ms: 20.0,
            crossfade_type: CrossfadeType::EqualPower,
            clipping_threshold_db: -0.5,
            timing_weight: 0.4,
            quality_weight: 0.3,
            clipping_weight: 0.3,
            time_signature: TimeSignature::COMMON,
            scoring_scope: ScoringScope::PerSegment,
        }
    }
}

impl CompEngineConfig {
    pub fn validate(&self) -> Result<(), CompError> {
        let sum = self.timing_weight + self.quality_weight + self.clipping_weight;
        if !sum.is_finite() || (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CompError::InvalidConfig(format!(
                "scoring weights must sum to 1.0 (got {sum:.4})"
            )));
        }
        for (name, w) in [
            ("timing_weight", self.timing_weight),
            ("quality_weight", self.quality_weight),
            ("clipping_weight", self.clipping_weight),
        ] {
            if w < 0.0 {
                return Err(CompError::InvalidConfig(format!("{name} must not be negative")));
            }
        }
        if !self.segment_size_beats.is_finite() || self.segment_size_beats <= 0.0 {
            return Err(CompError::InvalidConfig(format!(
                "segment_size_beats must be positive (got {})",
                self.segment_size_beats
            )));
        }
        if !self.crossfade_duration_ms.is_finite() || self.crossfade_duration_ms < 0.0 {
            return Err(CompError::InvalidConfig(format!(
                "crossfade_duration_ms must be >= 0 (got {})",
                self.crossfade_duration_ms
            )));
        }
        if !self.clipping_threshold_db.is_finite() {
            return Err(CompError::InvalidConfig(
                "clipping_threshold_db must be finite".to_string(),
            ));
        }
        if !self.time_signature.is_valid() {
            return Err(CompError::InvalidConfig(format!(
                "invalid time signature {}",
                self.time_signature
            )));
        }
        Ok(())
    }

    /// Segment length in bars.
    pub fn segment_bars(&self) -> f64 {
        self.time_signature.bars_for_beats(self.segment_size_beats)
    }

    /// Copy of `self` with every field set in `update` replaced.
    pub fn merged(&self, update: &CompConfigUpdate) -> Self {
        Self {
            segment_size_beats: update.segment_size_beats.unwrap_or(self.segment_size_beats),
            crossfade_duration_ms: update
                .crossfade_duration_ms
                .unwrap_or(self.crossfade_duration_ms),
            crossfade_type: update.crossfade_type.unwrap_or(self.crossfade_type),
            clipping_threshold_db: update
                .clipping_threshold_db
                .unwrap_or(self.clipping_threshold_db),
            timing_weight: update.timing_weight.unwrap_or(self.timing_weight),
            quality_weight: update.quality_weight.unwrap_or(self.quality_weight),
            clipping_weight: update.clipping_weight.unwrap_or(self.clipping_weight),
            time_signature: update.time_signature.unwrap_or(self.time_signature),
            scoring_scope: update.scoring_scope.unwrap_or(self.scoring_scope),
        }
    }
}

/// Partial config update; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompConfigUpdate {
    pub segment_size_beats: Option<f64>,
    pub crossfade_duration_ms: Option<f64>,
    pub crossfade_type: Option<CrossfadeType>,
    pub clipping_threshold_db: Option<f64>,
    pub timing_weight: Option<f64>,
    pub quality_weight: Option<f64>,
    pub clipping_weight: Option<f64>,
    pub time_signature: Option<TimeSignature>,
    pub scoring_scope: Option<ScoringScope>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let c = CompEngineConfig::default();
        c.validate().unwrap();
        assert!((c.segment_bars() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_sum_tolerance() {
        let mut c = CompEngineConfig::default();
        c.clipping_weight = 0.3005;
        assert!(c.validate().is_ok(), "within ±0.001");

        c.clipping_weight = 0.302;
        let err = c.validate().unwrap_err();
        assert_eq!(err.code(), "INVALID_COMP_CONFIG");

        c.clipping_weight = 0.29;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_granularity_and_meter() {
        let mut c = CompEngineConfig::default();
        c.segment_size_beats = 0.0;
        assert!(c.validate().is_err());

        let mut c = CompEngineConfig::default();
        c.crossfade_duration_ms = -1.0;
        assert!(c.validate().is_err());

        let mut c = CompEngineConfig::default();
        c.time_signature = TimeSignature::new(4, 0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_weight_even_if_sum_is_one() {
        let c = CompEngineConfig {
            timing_weight: 1.2,
            quality_weight: -0.2,
            clipping_weight: 0.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let base = CompEngineConfig::default();
        let update = CompConfigUpdate {
            crossfade_duration_ms: Some(35.0),
            segment_size_beats: Some(2.0),
            ..Default::default()
        };
        let merged = base.merged(&update);
        assert_eq!(merged.crossfade_duration_ms, 35.0);
        assert!((merged.segment_bars() - 0.5).abs() < 1e-12);
        assert_eq!(merged.timing_weight, base.timing_weight);
        assert_eq!(merged.time_signature, base.time_signature);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let c: CompEngineConfig = toml::from_str(
            r#"
            crossfade_duration_ms = 10.0
            scoring_scope = "whole_take"

            [time_signature]
            numerator = 3
            denominator = 4
            "#,
        )
        .unwrap();
        assert_eq!(c.crossfade_duration_ms, 10.0);
        assert_eq!(c.scoring_scope, ScoringScope::WholeTake);
        assert_eq!(c.time_signature, TimeSignature::new(3, 4));
        assert_eq!(c.timing_weight, 0.4);
    }
}
