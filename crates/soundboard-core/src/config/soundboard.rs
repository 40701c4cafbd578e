//! Top-level soundboard configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::AudioConfig;
use crate::engine::DEFAULT_GAIN;
use crate::keepalive::{DEFAULT_SENSITIVITY_DBFS, DEFAULT_TIMEOUT};
use crate::resample::ResampleQuality;

/// Audio client name registered with the sound server
pub const DEFAULT_CLIENT_NAME: &str = "libre_soundboard_client";

/// Everything needed to start the soundboard
///
/// Every field has a default, so partial YAML files are fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundboardConfig {
    /// Client name (JACK client, saved connection prefix)
    pub client_name: String,
    pub audio: AudioConfig,
    /// Gain for play requests that don't specify one
    pub default_gain: f32,
    /// Quality of ingestion-time rate conversion
    pub resample_quality: ResampleQuality,
    pub keep_alive: KeepAliveConfig,
}

impl Default for SoundboardConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            audio: AudioConfig::default(),
            default_gain: DEFAULT_GAIN,
            resample_quality: ResampleQuality::default(),
            keep_alive: KeepAliveConfig::default(),
        }
    }
}

/// Silence keep-alive settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Monitor the input port at all
    pub enabled: bool,
    /// Silence required before a trigger
    pub timeout_seconds: u64,
    /// Peak level that counts as sound
    pub sensitivity_dbfs: f64,
    /// Ignore `sensitivity_dbfs`; any non-zero sample counts as sound
    pub any_non_zero: bool,
    /// Connect the input port to the first capture port on start (JACK)
    pub auto_connect_input: bool,
    /// Gain for keep-alive playback; `None` uses the default gain
    pub override_volume: Option<f32>,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: DEFAULT_TIMEOUT.as_secs(),
            sensitivity_dbfs: DEFAULT_SENSITIVITY_DBFS,
            any_non_zero: false,
            auto_connect_input: true,
            override_volume: None,
        }
    }
}

impl KeepAliveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
