use std::path::Path;

use thiserror::Error;

use crate::audio::SampleBuffer;
use crate::comp::models::CompResult;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write a buffer as 32-bit float WAV.
pub fn write_wav(path: &Path, buffer: &SampleBuffer) -> Result<(), ExportError> {
    let spec = hound::WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in buffer.to_interleaved() {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    log::info!(
        "Wrote {} ({:.2}s, {} ch)",
        path.display(),
        buffer.duration_secs(),
        buffer.num_channels()
    );
    Ok(())
}

pub fn write_plan(path: &Path, plan: &CompResult) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn read_plan(path: &Path) -> Result<CompResult, ExportError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
