//! Audio backend configuration
//!
//! Device selection, buffer settings and routing behaviour for the host
//! that drives the soundboard callback.

use serde::{Deserialize, Serialize};

/// Maximum buffer size to pre-allocate (covers typical configurations)
/// Common values: 64, 128, 256, 512, 1024, 2048, 4096 frames
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
/// 512 frames is a safe default that works on most systems
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Default sample rate for the audio system (48kHz)
///
/// If the output device doesn't support it, the device's maximum supported
/// rate is used and clips are resampled to that on ingestion.
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose the default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
    /// Small, responsive buffer for instant triggering
    LowLatency,
}

impl BufferSize {
    /// Get the buffer size in frames, or None for system default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some(*frames),
            BufferSize::LowLatency => Some(256),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (JACK, ALSA, etc.)
/// so a device can be picked from a specific host when several are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "JACK", "ALSA", "CoreAudio")
    /// If None, every available host is searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Preferred sample rate for CPAL (JACK always uses the server rate)
    pub sample_rate: Option<u32>,

    /// Preferred buffer size (CPAL only)
    pub buffer_size: BufferSize,

    /// Output device (None = system default). CPAL only.
    pub device: Option<DeviceId>,

    /// Input device for keep-alive monitoring (None = system default). CPAL only.
    pub input_device: Option<DeviceId>,

    /// Connect the stereo outputs to the first playback pair on start. JACK only.
    pub auto_connect_outputs: bool,

    /// Reconnect ports from the saved connections file on start and save
    /// them again on shutdown. JACK only.
    pub restore_connections: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Some(DEFAULT_SAMPLE_RATE),
            buffer_size: BufferSize::default(),
            device: None,
            input_device: None,
            auto_connect_outputs: true,
            restore_connections: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_latency() {
        assert_eq!(BufferSize::Default.latency_ms(48000), None);
        let latency = BufferSize::Fixed(480).latency_ms(48000).unwrap();
        assert!((latency - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("hw:0,0").display_label(), "hw:0,0");
        assert_eq!(
            DeviceId::with_host("hw:0,0", "ALSA").display_label(),
            "[ALSA] hw:0,0"
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: AudioConfig = serde_yaml::from_str("buffer_size: !Fixed 128\n").unwrap();
        assert_eq!(config.buffer_size, BufferSize::Fixed(128));
        assert_eq!(config.sample_rate, Some(DEFAULT_SAMPLE_RATE));
        assert!(config.auto_connect_outputs);
    }

    #[test]
    fn test_low_latency_from_yaml() {
        let config: AudioConfig = serde_yaml::from_str("buffer_size: LowLatency\n").unwrap();
        assert_eq!(config.buffer_size.as_frames(), Some(256));
        assert!(config.device.is_none());
    }
}
