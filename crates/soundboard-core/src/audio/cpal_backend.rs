//! CPAL audio backend implementation
//!
//! One output stream runs the soundboard callback. When keep-alive input is
//! requested, a separate input stream captures the first channel of the
//! input device and hands it to the output callback through a lock-free ring
//! buffer:
//!
//! ```text
//!                    ┌───────────────────────┐
//!   Input device ───►│   Input Stream        │
//!                    │  (first channel only) │
//!                    └───────────┬───────────┘
//!                                │
//!                    ┌───────────▼───────────┐
//!                    │  Input Sample Queue   │  <── lock-free ring buffer
//!                    │  (SPSC, 4x buffer)    │      input produces, output consumes
//!                    └───────────┬───────────┘
//!                                │
//!                    ┌───────────▼───────────┐
//!                    │   Output Stream       │  <── owns the process callback,
//!                    │  (mixer + keep-alive) │      never blocks on input
//!                    └───────────────────────┘
//! ```
//!
//! The output callback only sees as much input as has arrived; a cycle with
//! no queued input runs with no input buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::backend::{AudioHost, ProcessCallback, StereoPair};
use super::config::{AudioConfig, BufferSize, DEFAULT_BUFFER_SIZE, MAX_BUFFER_SIZE};
use super::device::{find_device_by_id, find_input_device_by_id, get_cpal_default_device};
use super::error::{AudioError, AudioResult};
use crate::types::Sample;

/// Input device and stream settings chosen at open time
struct InputSetup {
    device: cpal::Device,
    config: StreamConfig,
}

/// CPAL output (and optional input) streams hosting the soundboard callback
///
/// Keeps the audio streams alive. Drop this to stop audio.
pub struct CpalHost {
    device: cpal::Device,
    device_name: String,
    stream_config: StreamConfig,
    input: Option<InputSetup>,
    input_name: Option<String>,
    /// Output stream, present once the callback is registered
    output_stream: Option<Stream>,
    input_stream: Option<Stream>,
    sample_rate: u32,
    /// Actual buffer size in frames (as negotiated with the device)
    buffer_size: u32,
}

impl CpalHost {
    /// Select devices and negotiate stream settings (streams not started)
    pub fn open(config: &AudioConfig, with_input: bool) -> AudioResult<Self> {
        let device = match &config.device {
            Some(id) => find_device_by_id(id)?,
            None => get_cpal_default_device()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using audio device: {}", device_name);

        let (supported_config, buffer_size) = get_output_config(&device, config)?;
        let sample_rate = supported_config.sample_rate().0;

        let stream_config = StreamConfig {
            channels: supported_config.channels(),
            sample_rate: supported_config.sample_rate(),
            buffer_size: CpalBufferSize::Fixed(buffer_size),
        };

        log::info!(
            "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
            stream_config.channels,
            sample_rate,
            buffer_size,
            (buffer_size as f32 / sample_rate as f32) * 1000.0
        );

        let input = if with_input {
            match open_input(config, sample_rate) {
                Ok(setup) => Some(setup),
                Err(e) => {
                    log::warn!("Keep-alive input unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let input_name = input
            .as_ref()
            .map(|i| i.device.name().unwrap_or_else(|_| "Unknown input".to_string()));

        Ok(Self {
            device,
            device_name,
            stream_config,
            input,
            input_name,
            output_stream: None,
            input_stream: None,
            sample_rate,
            buffer_size,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl AudioHost for CpalHost {
    fn operating_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn output_ports(&self) -> Vec<String> {
        vec![
            format!("{}:left", self.device_name),
            format!("{}:right", self.device_name),
        ]
    }

    fn input_port(&self) -> Option<String> {
        self.input_name.as_ref().map(|name| format!("{}:in", name))
    }

    fn register_process_callback(
        &mut self,
        callback: Box<dyn ProcessCallback>,
    ) -> AudioResult<()> {
        if self.output_stream.is_some() {
            return Err(AudioError::CallbackAlreadyRegistered);
        }

        let (input_stream, input_consumer) = match &self.input {
            Some(setup) => {
                // Capacity: 4x buffer size to absorb timing jitter between streams
                let capacity = (self.buffer_size as usize) * 4;
                let (producer, consumer) = rtrb::RingBuffer::<Sample>::new(capacity);
                let stream = build_input_stream(&setup.device, &setup.config, producer)?;
                (Some(stream), Some(consumer))
            }
            None => (None, None),
        };

        let output_stream =
            build_output_stream(&self.device, &self.stream_config, callback, input_consumer)?;

        output_stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;
        if let Some(stream) = &input_stream {
            stream
                .play()
                .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
        }

        log::info!(
            "Audio stream started{}",
            if input_stream.is_some() {
                " (with keep-alive input)"
            } else {
                ""
            }
        );

        self.output_stream = Some(output_stream);
        self.input_stream = input_stream;
        Ok(())
    }
}

/// Pick the input device and an f32 config, preferring the output rate
fn open_input(config: &AudioConfig, output_rate: u32) -> AudioResult<InputSetup> {
    let device = match &config.input_device {
        Some(id) => find_input_device_by_id(id)?,
        None => cpal::default_host()
            .default_input_device()
            .ok_or_else(|| AudioError::NoDefaultDevice("No default input device".to_string()))?,
    };

    let supported: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let best = supported
        .iter()
        .find(|c| output_rate >= c.min_sample_rate().0 && output_rate <= c.max_sample_rate().0)
        .or_else(|| supported.first())
        .ok_or_else(|| AudioError::UnsupportedFormat("input device has no f32 format".into()))?;

    let rate = if output_rate >= best.min_sample_rate().0 && output_rate <= best.max_sample_rate().0
    {
        cpal::SampleRate(output_rate)
    } else {
        // Levels are all keep-alive needs; a different rate only shifts timing granularity
        log::warn!(
            "Input device doesn't support {}Hz, capturing at {}Hz",
            output_rate,
            best.max_sample_rate().0
        );
        best.max_sample_rate()
    };

    let config = best.clone().with_sample_rate(rate).config();
    log::info!(
        "Input config: {} channels, {}Hz",
        config.channels,
        config.sample_rate.0
    );
    Ok(InputSetup { device, config })
}

/// Get the best output configuration for a device
///
/// Returns (SupportedStreamConfig, actual_buffer_size_in_frames)
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
) -> AudioResult<(cpal::SupportedStreamConfig, u32)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    if supported_configs.is_empty() {
        return Err(AudioError::ConfigError(
            "No supported output configurations".to_string(),
        ));
    }

    let target_sample_rate = config
        .sample_rate
        .unwrap_or(super::config::DEFAULT_SAMPLE_RATE);

    // Only f32 output is supported; prefer stereo at the requested rate
    let f32_configs: Vec<_> = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let best_config = f32_configs
        .iter()
        .find(|c| {
            c.channels() >= 2
                && target_sample_rate >= c.min_sample_rate().0
                && target_sample_rate <= c.max_sample_rate().0
        })
        .or_else(|| f32_configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| f32_configs.first())
        .ok_or_else(|| AudioError::UnsupportedFormat("output device has no f32 format".into()))?;

    let sample_rate = if target_sample_rate >= best_config.min_sample_rate().0
        && target_sample_rate <= best_config.max_sample_rate().0
    {
        cpal::SampleRate(target_sample_rate)
    } else {
        // Device doesn't support requested rate - use max supported rate
        let fallback = best_config.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (clips will be resampled)",
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    let stream_config = (*best_config).clone().with_sample_rate(sample_rate);

    let buffer_size = match config.buffer_size {
        BufferSize::Default => DEFAULT_BUFFER_SIZE,
        BufferSize::Fixed(frames) => frames.clamp(64, MAX_BUFFER_SIZE as u32),
        BufferSize::LowLatency => config.buffer_size.as_frames().unwrap_or(DEFAULT_BUFFER_SIZE),
    };

    log::debug!(
        "Selected buffer size: {} frames for {:?} mode",
        buffer_size,
        config.buffer_size
    );

    Ok((stream_config, buffer_size))
}

/// Build the output stream that owns the process callback
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut callback: Box<dyn ProcessCallback>,
    mut input_consumer: Option<rtrb::Consumer<Sample>>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    // Pre-allocated planar buffers (RT-safe: no allocation in the callback)
    let mut left = vec![0.0; MAX_BUFFER_SIZE];
    let mut right = vec![0.0; MAX_BUFFER_SIZE];
    let mut input = vec![0.0; MAX_BUFFER_SIZE];

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let n_frames = (data.len() / channels).min(MAX_BUFFER_SIZE);

                // Drain whatever input has arrived (non-blocking)
                let mut received = 0;
                if let Some(consumer) = input_consumer.as_mut() {
                    while received < n_frames {
                        match consumer.pop() {
                            Ok(sample) => {
                                input[received] = sample;
                                received += 1;
                            }
                            Err(_) => break,
                        }
                    }
                }
                let cycle_input = (received > 0).then(|| &input[..received]);

                {
                    let mut outputs = [&mut left[..n_frames], &mut right[..n_frames]];
                    callback.process(&mut outputs, cycle_input);
                }

                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    if i < n_frames {
                        frame[0] = left[i];
                        if channels > 1 {
                            frame[1] = right[i];
                        }
                        // Fill additional channels with silence
                        for ch in frame.iter_mut().skip(2) {
                            *ch = 0.0;
                        }
                    } else {
                        frame.fill(0.0);
                    }
                }
            },
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

/// Build the input stream feeding the keep-alive ring buffer
fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<Sample>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    // Output side is behind: drop the rest of this block
                    if producer.push(frame[0]).is_err() {
                        break;
                    }
                }
            },
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Device Enumeration
// ═══════════════════════════════════════════════════════════════════════════════

/// Get available stereo output pairs
///
/// For CPAL, each device is treated as a stereo pair since CPAL handles
/// channel routing internally. The left/right fields contain the device ID.
pub fn get_available_stereo_pairs() -> Vec<StereoPair> {
    super::device::get_available_output_devices()
        .into_iter()
        .map(|d| {
            let device_id = d.id.display_label();
            StereoPair {
                label: format!("[{}] {}", d.host, d.name),
                left: device_id.clone(),
                right: device_id,
            }
        })
        .collect()
}
