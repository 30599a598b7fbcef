use chrono::{DateTime, Utc};

use crate::analyzer::metrics::{self, MetricsError, TakeMetrics};
use crate::audio::SampleBuffer;

/// One recorded performance pass over a bar region.
///
/// Created by the recording side once a loop pass finishes and read-only
/// afterwards: the comp engine only ever borrows takes.
#[derive(Debug, Clone)]
pub struct Take {
    id: String,
    pass_index: u32,
    start_bar: f64,
    end_bar: f64,
    tempo_bpm: f64,
    samples: SampleBuffer,
    metrics: TakeMetrics,
    /// True when `metrics` were measured from `samples` by [`Take::new`].
    measured: bool,
    timestamp: DateTime<Utc>,
}

impl Take {
    /// Create a take and measure its metrics at `tempo_bpm`.
    pub fn new(
        id: impl Into<String>,
        pass_index: u32,
        start_bar: f64,
        end_bar: f64,
        tempo_bpm: f64,
        samples: SampleBuffer,
    ) -> Result<Self, MetricsError> {
        let metrics = metrics::extract_metrics(&samples, tempo_bpm)?;
        let mut take = Self::with_metrics(
            id, pass_index, start_bar, end_bar, tempo_bpm, samples, metrics,
        );
        take.measured = true;
        Ok(take)
    }

    /// Create a take with metrics measured elsewhere. Scoring always uses
    /// these metrics as given and never re-analyses `samples`.
    pub fn with_metrics(
        id: impl Into<String>,
        pass_index: u32,
        start_bar: f64,
        end_bar: f64,
        tempo_bpm: f64,
        samples: SampleBuffer,
        metrics: TakeMetrics,
    ) -> Self {
        Self {
            id: id.into(),
            pass_index,
            start_bar,
            end_bar,
            tempo_bpm,
            samples,
            metrics,
            measured: false,
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pass_index(&self) -> u32 {
        self.pass_index
    }

    pub fn start_bar(&self) -> f64 {
        self.start_bar
    }

    pub fn end_bar(&self) -> f64 {
        self.end_bar
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn metrics(&self) -> &TakeMetrics {
        &self.metrics
    }

    /// Whether the metrics came from this take's own samples.
    pub fn has_measured_metrics(&self) -> bool {
        self.measured
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the take's bar region overlaps `[start, end)`.
    pub fn covers(&self, start: f64, end: f64) -> bool {
        self.start_bar < end && start < self.end_bar
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{clean_metrics, metrics_take, supplied_metrics_take, timed_take};

    #[test]
    fn test_metrics_origin() {
        assert!(timed_take("a", 0, &[2.0]).has_measured_metrics());
        let supplied = supplied_metrics_take("b", 1, &[2.0], clean_metrics(9.0));
        assert!(!supplied.has_measured_metrics());
        assert_eq!(supplied.metrics(), &clean_metrics(9.0));
    }

    #[test]
    fn test_covers_is_half_open_overlap() {
        // bars 0..8
        let take = metrics_take("a", 0, clean_metrics(1.0));
        assert!(take.covers(7.0, 9.0));
        assert!(take.covers(0.0, 1.0));
        assert!(!take.covers(8.0, 9.0));
        assert!(!take.covers(-2.0, 0.0));
    }
}
