pub mod decode;
pub mod metrics;

use crate::comp::models::TimeSignature;
use crate::scanner::TakeFile;
use crate::take::Take;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("Decode error: {0}")]
    Decode(#[from] decode::DecodeError),
    #[error("Metrics error: {0}")]
    Metrics(#[from] metrics::MetricsError),
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub struct LoadResult {
    /// Successfully analysed takes, in input order.
    pub takes: Vec<Take>,
    pub failed: u64,
}

/// Decode take files and measure their metrics in parallel.
///
/// Files that fail to decode are logged and counted, not fatal. A take
/// starts at the bar parsed from its file name, else at `default_start_bar`,
/// and spans as many bars as its audio lasts at `bpm`.
pub fn load_takes(
    files: &[TakeFile],
    bpm: f64,
    default_start_bar: f64,
    time_signature: TimeSignature,
    jobs: usize,
) -> Result<LoadResult, AnalyzeError> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(AnalyzeError::InvalidTempo(bpm));
    }
    if files.is_empty() {
        log::info!("No take files to analyze");
        return Ok(LoadResult {
            takes: Vec::new(),
            failed: 0,
        });
    }

    log::info!("Analyzing {} takes with {} workers", files.len(), jobs);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let results: Vec<_> = pool.install(|| {
        use rayon::prelude::*;
        files
            .par_iter()
            .map(|file| {
                pb.set_message(file.id.clone());
                let result = load_single_take(file, bpm, default_start_bar, time_signature);
                pb.inc(1);
                result
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut takes = Vec::with_capacity(results.len());
    let mut failed: u64 = 0;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(take) => takes.push(take),
            Err(e) => {
                log::error!("Failed to analyze {}: {}", file.path.display(), e);
                failed += 1;
            }
        }
    }

    log::info!("Analyzed {} takes, {} failed", takes.len(), failed);
    Ok(LoadResult { takes, failed })
}

fn load_single_take(
    file: &TakeFile,
    bpm: f64,
    default_start_bar: f64,
    time_signature: TimeSignature,
) -> Result<Take, AnalyzeError> {
    let samples = decode::load_audio(&file.path)?;
    let start_bar = file.start_bar.unwrap_or(default_start_bar);
    let end_bar = start_bar + samples.duration_secs() / time_signature.seconds_per_bar(bpm);
    let take = Take::new(&file.id, file.pass_index, start_bar, end_bar, bpm, samples)?;
    log::debug!(
        "{}: bars {:.2}-{:.2}, {:?}",
        take.id(),
        take.start_bar(),
        take.end_bar(),
        take.metrics()
    );
    Ok(take)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::export::write_wav;
    use crate::testutil::{BPM, SR, click_track};
    use std::path::Path;

    fn write_take(dir: &Path, name: &str, offsets: &[f64]) -> TakeFile {
        let path = dir.join(name);
        let buffer = SampleBuffer::new(click_track(offsets, BPM, SR, 1), SR).unwrap();
        write_wav(&path, &buffer).unwrap();
        let parsed = crate::scanner::filename::parse_filename(&path);
        TakeFile {
            id: path.file_stem().unwrap().to_string_lossy().into_owned(),
            path,
            pass_index: parsed.pass.unwrap_or(0),
            start_bar: parsed.start_bar,
        }
    }

    #[test]
    fn test_load_takes_from_wav() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_take(dir.path(), "take1.wav", &[2.0, 2.0]),
            write_take(dir.path(), "take2_bar4.wav", &[30.0, 30.0]),
        ];
        let result = load_takes(&files, BPM, 0.0, TimeSignature::COMMON, 2).unwrap();
        assert_eq!(result.failed, 0);
        assert_eq!(result.takes.len(), 2);

        let t1 = &result.takes[0];
        assert_eq!(t1.id(), "take1");
        assert_eq!(t1.pass_index(), 1);
        assert_eq!(t1.start_bar(), 0.0);
        assert!((t1.end_bar() - 2.0).abs() < 1e-9);

        let t2 = &result.takes[1];
        assert_eq!(t2.start_bar(), 4.0);
        assert!((t2.end_bar() - 6.0).abs() < 1e-9);
        assert!(t1.metrics().timing_error_ms < t2.metrics().timing_error_ms);
    }

    #[test]
    fn test_bad_file_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_take(dir.path(), "take1.wav", &[2.0]);
        let bad_path = dir.path().join("take2.wav");
        std::fs::write(&bad_path, b"not a wav").unwrap();
        let bad = TakeFile {
            path: bad_path,
            id: "take2".to_string(),
            pass_index: 2,
            start_bar: None,
        };

        let result = load_takes(&[good, bad], BPM, 0.0, TimeSignature::COMMON, 1).unwrap();
        assert_eq!(result.takes.len(), 1);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn test_rejects_bad_tempo() {
        assert!(matches!(
            load_takes(&[], 0.0, 0.0, TimeSignature::COMMON, 1),
            Err(AnalyzeError::InvalidTempo(_))
        ));
    }
}
