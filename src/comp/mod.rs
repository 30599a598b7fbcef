pub mod config;
pub mod models;
pub mod planner;
pub mod render;
pub mod scoring;

use thiserror::Error;

use crate::audio::{AudioError, SampleBuffer};
use crate::take::Take;
use config::{CompConfigUpdate, CompEngineConfig};
use models::{BarRange, CompResult, ManualSegment};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompError {
    #[error("Invalid comp config: {0}")]
    InvalidConfig(String),
    #[error("No takes to comp")]
    NoTakes,
    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),
    #[error("Audio buffer error: {0}")]
    Audio(#[from] AudioError),
}

impl CompError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_COMP_CONFIG",
            Self::NoTakes => "NO_TAKES",
            Self::InvalidTempo(_) => "INVALID_TEMPO",
            Self::Audio(_) => "INVALID_AUDIO",
        }
    }
}

/// A comp engine bound to one output sample rate and one validated config.
///
/// Instances share nothing, so independent engines (or independent requests
/// on one engine) can plan and render on separate threads.
#[derive(Debug, Clone)]
pub struct CompEngine {
    sample_rate: u32,
    config: CompEngineConfig,
}

impl CompEngine {
    pub fn new(sample_rate: u32, config: CompEngineConfig) -> Result<Self, CompError> {
        if sample_rate == 0 {
            return Err(CompError::InvalidConfig("sample rate must be positive".to_string()));
        }
        config.validate()?;
        log::debug!("Comp engine at {} Hz: {:?}", sample_rate, config);
        Ok(Self {
            sample_rate,
            config,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &CompEngineConfig {
        &self.config
    }

    /// Apply a partial update. On error the current config is kept.
    pub fn set_config(&mut self, update: &CompConfigUpdate) -> Result<&CompEngineConfig, CompError> {
        let merged = self.config.merged(update);
        merged.validate()?;
        self.config = merged;
        Ok(&self.config)
    }

    pub fn plan_auto(&self, takes: &[Take], region: &BarRange) -> Result<CompResult, CompError> {
        planner::plan_auto(takes, region, &self.config)
    }

    pub fn plan_manual(&self, takes: &[Take], segments: &[ManualSegment]) -> CompResult {
        planner::plan_manual(takes, segments, &self.config)
    }

    /// Render `plan` to a new stereo buffer at the engine's sample rate.
    pub fn render(&self, takes: &[Take], plan: &CompResult, bpm: f64) -> Result<SampleBuffer, CompError> {
        render::render(takes, plan, bpm, self.sample_rate, self.config.time_signature)
    }
}
