//! Common types for the soundboard core
//!
//! The sample type and the validated clip that the control plane hands to
//! the resampler and the voice registry.

use std::sync::Arc;

use crate::engine::IngestError;

/// Audio sample type (32-bit float, nominal range [-1.0, 1.0])
pub type Sample = f32;

/// A decoded block of interleaved samples at a known rate and channel count
///
/// Construction validates the shape, so a clip that exists is never empty,
/// never has zero channels and never has a zero sample rate. The sample
/// storage is shared: cloning a clip or building several voices from it
/// does not copy audio data.
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Arc<[Sample]>,
    sample_rate: u32,
    channels: usize,
}

impl AudioClip {
    /// Validate and wrap interleaved samples
    ///
    /// Trailing samples that do not form a whole frame are dropped.
    pub fn new(
        samples: impl Into<Arc<[Sample]>>,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Self, IngestError> {
        if channels == 0 {
            return Err(IngestError::InvalidChannelCount);
        }
        if sample_rate == 0 {
            return Err(IngestError::InvalidSampleRate(sample_rate));
        }
        let mut samples: Arc<[Sample]> = samples.into();
        let whole = (samples.len() / channels) * channels;
        if whole == 0 {
            return Err(IngestError::EmptyBuffer);
        }
        if whole != samples.len() {
            log::debug!(
                "AudioClip: dropping {} trailing samples (partial frame)",
                samples.len() - whole
            );
            samples = Arc::from(&samples[..whole]);
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Interleaved samples
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Shared handle to the interleaved samples
    pub fn shared_samples(&self) -> Arc<[Sample]> {
        Arc::clone(&self.samples)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Duration in seconds at the clip's own rate
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_rejects_zero_channels() {
        let err = AudioClip::new(vec![0.0; 4], 48000, 0).unwrap_err();
        assert!(matches!(err, IngestError::InvalidChannelCount));
    }

    #[test]
    fn test_clip_rejects_empty_buffer() {
        let err = AudioClip::new(Vec::<f32>::new(), 48000, 1).unwrap_err();
        assert!(matches!(err, IngestError::EmptyBuffer));

        // One sample is not a whole stereo frame
        let err = AudioClip::new(vec![0.5], 48000, 2).unwrap_err();
        assert!(matches!(err, IngestError::EmptyBuffer));
    }

    #[test]
    fn test_clip_rejects_zero_rate() {
        let err = AudioClip::new(vec![0.0; 4], 0, 1).unwrap_err();
        assert!(matches!(err, IngestError::InvalidSampleRate(0)));
    }

    #[test]
    fn test_clip_trims_partial_frame() {
        let clip = AudioClip::new(vec![0.1, 0.2, 0.3, 0.4, 0.5], 44100, 2).unwrap();
        assert_eq!(clip.frames(), 2);
        assert_eq!(clip.samples(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip::new(vec![0.0; 48000 * 2], 48000, 2).unwrap();
        assert!((clip.duration_secs() - 1.0).abs() < 1e-9);
    }
}
