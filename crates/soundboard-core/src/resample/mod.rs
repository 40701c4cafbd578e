//! Sample rate conversion for clip ingestion
//!
//! Runs on the control plane only, before a voice is built. Clips already
//! at the operating rate pass straight through (shared, not copied).
//! Everything else goes through `rubato`'s band-limited sinc resampler:
//!
//! 1. De-interleave into planar channels
//! 2. Feed fixed-size chunks, then the remainder, then flush the filter tail
//! 3. Drop the resampler's leading delay
//! 4. Trim to the nominal output length, never past what was produced
//! 5. Re-interleave
//!
//! The output estimate `ceil(frames * ratio) + 1` sizes the allocation; the
//! final buffer is trimmed to the frames actually produced. Both lengths are
//! computed on the integer rates so float rounding never adds a frame. Any resampler
//! error aborts ingestion, so a partial buffer is never returned.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::{Deserialize, Serialize};

use crate::engine::IngestError;
use crate::types::{AudioClip, Sample};

/// Input frames per resampler call
const CHUNK_FRAMES: usize = 1024;

/// Upper bound on tail-flush calls (the sinc tail is far shorter)
const MAX_FLUSH_CALLS: usize = 16;

/// Conversion quality / speed trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleQuality {
    /// Short filter, linear interpolation between table points
    Fast,
    /// Balanced sinc filter (default)
    #[default]
    Medium,
    /// Long filter, cubic interpolation
    Best,
}

impl ResampleQuality {
    fn parameters(self) -> SincInterpolationParameters {
        match self {
            ResampleQuality::Fast => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.91,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::Hann2,
            },
            ResampleQuality::Medium => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.925,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
            ResampleQuality::Best => SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

/// Normalizes clips to the engine's operating rate
#[derive(Debug, Clone, Copy)]
pub struct SampleRateConverter {
    target_rate: u32,
    quality: ResampleQuality,
}

impl SampleRateConverter {
    pub fn new(target_rate: u32, quality: ResampleQuality) -> Self {
        Self {
            target_rate,
            quality,
        }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    pub fn quality(&self) -> ResampleQuality {
        self.quality
    }

    /// Frames `input_frames` cover at `target_rate`, rounded up
    pub fn nominal_output_frames(
        input_frames: usize,
        source_rate: u32,
        target_rate: u32,
    ) -> usize {
        if source_rate == 0 {
            return 0;
        }
        let numerator = input_frames as u64 * target_rate as u64;
        numerator.div_ceil(source_rate as u64) as usize
    }

    /// Upper-bound frame estimate for converting `input_frames`
    pub fn estimate_output_frames(
        input_frames: usize,
        source_rate: u32,
        target_rate: u32,
    ) -> usize {
        Self::nominal_output_frames(input_frames, source_rate, target_rate) + 1
    }

    /// Convert `clip` to the target rate
    pub fn convert(&self, clip: &AudioClip) -> Result<AudioClip, IngestError> {
        if clip.sample_rate() == self.target_rate {
            log::debug!(
                "No resample needed; frames={} @ {}Hz",
                clip.frames(),
                clip.sample_rate()
            );
            return Ok(clip.clone());
        }

        let channels = clip.channels();
        let input_frames = clip.frames();
        let ratio = self.target_rate as f64 / clip.sample_rate() as f64;
        let nominal =
            Self::nominal_output_frames(input_frames, clip.sample_rate(), self.target_rate);
        let estimate = nominal + 1;

        let planar = deinterleave(clip.samples(), channels);
        let produced = self.run(&planar, ratio, estimate)?;

        // Never report more than the converter actually produced
        let produced_frames = produced.first().map(Vec::len).unwrap_or(0);
        let frames = produced_frames.min(nominal);

        let mut interleaved = Vec::with_capacity(estimate * channels);
        for frame in 0..frames {
            for channel in &produced {
                interleaved.push(channel[frame]);
            }
        }
        interleaved.truncate(frames * channels);

        log::info!(
            "Resampled {} frames @ {}Hz -> {} frames @ {}Hz ({:?})",
            input_frames,
            clip.sample_rate(),
            frames,
            self.target_rate,
            self.quality
        );

        AudioClip::new(interleaved, self.target_rate, channels)
    }

    /// Run the sinc resampler over planar input, returning delay-compensated
    /// planar output
    fn run(
        &self,
        planar: &[Vec<Sample>],
        ratio: f64,
        estimate: usize,
    ) -> Result<Vec<Vec<Sample>>, IngestError> {
        let channels = planar.len();
        let input_frames = planar.first().map(Vec::len).unwrap_or(0);

        let mut resampler = SincFixedIn::<Sample>::new(
            ratio,
            1.0,
            self.quality.parameters(),
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| IngestError::Resampler(e.to_string()))?;

        let delay = resampler.output_delay();
        let wanted = estimate + delay;
        let mut output: Vec<Vec<Sample>> = vec![Vec::with_capacity(wanted); channels];

        let append = |output: &mut Vec<Vec<Sample>>, block: Vec<Vec<Sample>>| {
            for (out, produced) in output.iter_mut().zip(block) {
                out.extend_from_slice(&produced);
            }
        };

        let mut pos = 0;
        while input_frames - pos >= resampler.input_frames_next() {
            let n = resampler.input_frames_next();
            let chunk: Vec<&[Sample]> = planar.iter().map(|c| &c[pos..pos + n]).collect();
            let block = resampler
                .process(chunk.as_slice(), None)
                .map_err(|e| IngestError::Resampler(e.to_string()))?;
            append(&mut output, block);
            pos += n;
        }

        if pos < input_frames {
            let rest: Vec<&[Sample]> = planar.iter().map(|c| &c[pos..]).collect();
            let block = resampler
                .process_partial(Some(rest.as_slice()), None)
                .map_err(|e| IngestError::Resampler(e.to_string()))?;
            append(&mut output, block);
        }

        // Flush the filter tail until the delayed output covers the input
        let mut flushes = 0;
        while output.first().map(Vec::len).unwrap_or(0) < wanted && flushes < MAX_FLUSH_CALLS {
            let block = resampler
                .process_partial(None::<&[&[Sample]]>, None)
                .map_err(|e| IngestError::Resampler(e.to_string()))?;
            append(&mut output, block);
            flushes += 1;
        }

        for channel in output.iter_mut() {
            let skip = delay.min(channel.len());
            channel.drain(..skip);
        }

        Ok(output)
    }
}

/// Split interleaved samples into one vector per channel
fn deinterleave(samples: &[Sample], channels: usize) -> Vec<Vec<Sample>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    planar
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, rate: u32, channels: usize, freq: f32) -> AudioClip {
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let s = (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5;
            for _ in 0..channels {
                samples.push(s);
            }
        }
        AudioClip::new(samples, rate, channels).unwrap()
    }

    #[test]
    fn test_same_rate_passes_through() {
        let converter = SampleRateConverter::new(48000, ResampleQuality::Medium);
        let clip = sine(1000, 48000, 2, 440.0);
        let out = converter.convert(&clip).unwrap();
        assert_eq!(out.samples(), clip.samples());
        assert_eq!(out.sample_rate(), 48000);
    }

    #[test]
    fn test_estimate_is_upper_bound_formula() {
        assert_eq!(SampleRateConverter::estimate_output_frames(44100, 44100, 48000), 48001);
        assert_eq!(SampleRateConverter::estimate_output_frames(3, 24000, 48000), 7);
        assert_eq!(SampleRateConverter::nominal_output_frames(100, 22050, 48000), 218);
        assert_eq!(SampleRateConverter::nominal_output_frames(10, 48000, 44100), 10);
    }

    #[test]
    fn test_one_second_upsample_is_exact() {
        let converter = SampleRateConverter::new(48000, ResampleQuality::Fast);
        let clip = sine(44100, 44100, 1, 440.0);
        let out = converter.convert(&clip).unwrap();
        assert_eq!(out.frames(), 48000);
    }

    #[test]
    fn test_converter_failure_is_reported() {
        // A zero target rate is rejected by the resampler itself
        let converter = SampleRateConverter::new(0, ResampleQuality::Fast);
        let clip = sine(256, 44100, 1, 440.0);
        assert!(matches!(
            converter.convert(&clip),
            Err(IngestError::Resampler(_))
        ));
    }

    #[test]
    fn test_upsample_preserves_duration() {
        let converter = SampleRateConverter::new(48000, ResampleQuality::Medium);
        let clip = sine(44100, 44100, 2, 440.0);
        let out = converter.convert(&clip).unwrap();

        assert_eq!(out.sample_rate(), 48000);
        assert_eq!(out.channels(), 2);
        assert!(out.frames() <= SampleRateConverter::estimate_output_frames(44100, 44100, 48000));
        assert!((out.duration_secs() - clip.duration_secs()).abs() < 0.01);
    }

    #[test]
    fn test_downsample_preserves_duration() {
        let converter = SampleRateConverter::new(44100, ResampleQuality::Fast);
        let clip = sine(9600, 96000, 1, 1000.0);
        let out = converter.convert(&clip).unwrap();

        assert_eq!(out.sample_rate(), 44100);
        assert!((out.duration_secs() - clip.duration_secs()).abs() < 0.01);
    }

    #[test]
    fn test_short_clip_shorter_than_chunk() {
        let converter = SampleRateConverter::new(48000, ResampleQuality::Best);
        let clip = sine(100, 22050, 1, 200.0);
        let out = converter.convert(&clip).unwrap();
        assert!(out.frames() > 0);
        assert!(out.frames() <= SampleRateConverter::estimate_output_frames(100, 22050, 48000));
    }

    #[test]
    fn test_converted_signal_keeps_level() {
        let converter = SampleRateConverter::new(48000, ResampleQuality::Medium);
        let clip = sine(44100, 44100, 1, 440.0);
        let out = converter.convert(&clip).unwrap();

        // Ignore the edges; the body of a 0.5-amplitude sine should peak near 0.5
        let body = &out.samples()[4800..out.samples().len() - 4800];
        let peak = body.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
    }

    #[test]
    fn test_deinterleave() {
        let planar = deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);
        assert_eq!(planar, vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]);
    }
}
