use thiserror::Error;

/// A single audio sample (32-bit float, nominal range -1.0 to 1.0).
pub type Sample = f32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Unsupported channel count: {0} (expected 1 or 2)")]
    InvalidChannels(usize),
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("Channel length mismatch: channel {channel} has {len} frames, expected {expected}")]
    LengthMismatch {
        channel: usize,
        len: usize,
        expected: usize,
    },
}

/// Planar PCM buffer: one `Vec` per channel, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<Sample>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer from per-channel sample vectors (1 or 2 channels).
    pub fn new(channels: Vec<Vec<Sample>>, sample_rate: u32) -> Result<Self, AudioError> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(AudioError::InvalidChannels(channels.len()));
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        let expected = channels[0].len();
        for (channel, data) in channels.iter().enumerate() {
            if data.len() != expected {
                return Err(AudioError::LengthMismatch {
                    channel,
                    len: data.len(),
                    expected,
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<Sample>, sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(vec![samples], sample_rate)
    }

    /// A zero-filled stereo buffer of `frames` frames.
    pub fn silent_stereo(frames: usize, sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(vec![vec![0.0; frames], vec![0.0; frames]], sample_rate)
    }

    /// Build from interleaved data (`[L0, R0, L1, R1, ...]` for stereo).
    pub fn from_interleaved(
        data: &[Sample],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if num_channels == 0 || num_channels > 2 {
            return Err(AudioError::InvalidChannels(num_channels));
        }
        let frames = data.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in data.chunks_exact(num_channels) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, ch: usize) -> &[Sample] {
        &self.channels[ch]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [Sample] {
        &mut self.channels[ch]
    }

    pub fn channels(&self) -> &[Vec<Sample>] {
        &self.channels
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> Sample {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    /// Interleave channels for writing (`[L0, R0, L1, R1, ...]`).
    pub fn to_interleaved(&self) -> Vec<Sample> {
        let n = self.num_channels();
        let mut out = Vec::with_capacity(self.frames() * n);
        for i in 0..self.frames() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_channel_counts() {
        assert_eq!(
            SampleBuffer::new(vec![], 48000),
            Err(AudioError::InvalidChannels(0))
        );
        assert_eq!(
            SampleBuffer::new(vec![vec![0.0]; 3], 48000),
            Err(AudioError::InvalidChannels(3))
        );
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        assert_eq!(
            SampleBuffer::mono(vec![0.0], 0),
            Err(AudioError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn test_rejects_ragged_channels() {
        let err = SampleBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(matches!(err, AudioError::LengthMismatch { channel: 1, len: 3, expected: 4 }));
    }

    #[test]
    fn test_interleave_roundtrip() {
        let data = vec![0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buf = SampleBuffer::from_interleaved(&data, 2, 44100).unwrap();
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buf.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buf.to_interleaved(), data);
    }

    #[test]
    fn test_peak_and_duration() {
        let buf = SampleBuffer::new(vec![vec![0.2, -0.7], vec![0.5, 0.1]], 2).unwrap();
        assert!((buf.peak() - 0.7).abs() < 1e-6);
        assert!((buf.duration_secs() - 1.0).abs() < 1e-12);
    }
}
