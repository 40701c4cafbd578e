//! WAV decoding for files handed to the soundboard

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};

/// Interleaved f32 samples of a whole file
pub struct DecodedWav {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

/// Decode a WAV file to interleaved f32 in [-1, 1]
pub fn decode_wav(path: &Path) -> Result<DecodedWav> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("Failed to open WAV file: {:?}", path))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read samples from {:?}", path))?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to read samples from {:?}", path))?
        }
    };

    log::debug!(
        "Decoded {:?}: {} frames, {} channels @ {}Hz",
        path,
        samples.len() / spec.channels.max(1) as usize,
        spec.channels,
        spec.sample_rate
    );

    Ok(DecodedWav {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_int16_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(-32768i16).unwrap();
        }
        writer.finalize().unwrap();

        let wav = decode_wav(&path).unwrap();
        assert_eq!(wav.channels, 2);
        assert_eq!(wav.sample_rate, 44100);
        assert_eq!(wav.samples.len(), 20);
        assert_eq!(wav.samples[0], 0.5);
        assert_eq!(wav.samples[1], -1.0);
    }

    #[test]
    fn test_decode_float_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.write_sample(-0.75f32).unwrap();
        writer.finalize().unwrap();

        let wav = decode_wav(&path).unwrap();
        assert_eq!(wav.samples, vec![0.25, -0.75]);
    }

    #[test]
    fn test_decode_missing_file_fails() {
        assert!(decode_wav(Path::new("/nonexistent/sound.wav")).is_err());
    }
}
