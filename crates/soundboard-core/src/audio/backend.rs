//! Host capability interface and audio system startup
//!
//! The soundboard core never talks to an audio API directly. A host exposes
//! its operating rate, its logical ports and a way to install exactly one
//! process callback:
//! - **Linux**: Native JACK with port-level routing (`jack-backend` feature)
//! - **Windows/macOS**: CPAL for cross-platform device support
//! - **Tests**: [`OfflineHost`](super::OfflineHost), driven by hand
//!
//! [`attach_soundboard`] builds the registry, mixer, keep-alive monitor and
//! processor on top of any host and installs the callback.

use crate::config::SoundboardConfig;
use crate::engine::{Soundboard, SoundboardProcessor, VoiceMixer, VoiceRegistry};
use crate::keepalive::{Clock, KeepAliveHandle, KeepAliveMonitor, KeepAliveReceiver, SystemClock};
use crate::types::Sample;

use super::error::AudioResult;

/// The real-time process callback installed into a host
///
/// Called once per host cycle with one buffer per output port (all of the
/// same frame count) and, if the host has an input port, the mono input
/// buffer of that cycle. Must not block, allocate or panic.
pub trait ProcessCallback: Send + 'static {
    fn process(&mut self, outputs: &mut [&mut [Sample]], input: Option<&[Sample]>);
}

/// What the core needs from an audio host
pub trait AudioHost {
    /// Rate the host runs the callback at; every voice is normalized to it
    fn operating_sample_rate(&self) -> u32;

    /// Frames per callback (nominal)
    fn buffer_size(&self) -> u32;

    /// Logical output port names, left first
    fn output_ports(&self) -> Vec<String>;

    /// Logical input port name, if input monitoring is available
    fn input_port(&self) -> Option<String>;

    /// Install the process callback and start processing
    ///
    /// A host accepts one callback; a second call fails with
    /// [`AudioError::CallbackAlreadyRegistered`](super::AudioError::CallbackAlreadyRegistered).
    fn register_process_callback(&mut self, callback: Box<dyn ProcessCallback>)
        -> AudioResult<()>;

    /// One-way output latency in milliseconds
    fn latency_ms(&self) -> f32 {
        (self.buffer_size() as f32 / self.operating_sample_rate() as f32) * 1000.0
    }
}

/// Stereo output pair for audio routing
///
/// - On JACK: Specific port names like "system:playback_1" and "system:playback_2"
/// - On CPAL: Device identifier (left/right are implicit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoPair {
    /// Human-readable label (e.g., "system 1-2" or "[ALSA] hw:0,0")
    pub label: String,
    /// Left channel identifier (port name for JACK, device ID for CPAL)
    pub left: String,
    /// Right channel identifier (port name for JACK, same as left for CPAL)
    pub right: String,
}

impl std::fmt::Display for StereoPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A running soundboard on top of host `H`
///
/// Dropping it drops the host, which stops the callback.
pub struct AudioSystem<H: AudioHost = AudioHandle> {
    /// The host (keep alive while playing)
    pub host: H,
    /// Control-plane entry point for play/stop/gain
    pub soundboard: Soundboard,
    /// Keep-alive control, present when monitoring is running
    pub keep_alive: Option<KeepAliveHandle>,
    /// Keep-alive triggers, present when monitoring is running
    pub keep_alive_events: Option<KeepAliveReceiver>,
    /// Operating sample rate
    pub sample_rate: u32,
    /// Actual buffer size in frames
    pub buffer_size: u32,
    /// Audio latency in milliseconds (one-way, output only)
    pub latency_ms: f32,
}

/// Wire a soundboard onto `host` using the system clock for keep-alive
pub fn attach_soundboard<H: AudioHost>(
    host: H,
    config: &SoundboardConfig,
) -> AudioResult<AudioSystem<H>> {
    attach_soundboard_with_clock(host, config, SystemClock)
}

/// Wire a soundboard onto `host` with an explicit keep-alive clock
pub fn attach_soundboard_with_clock<H: AudioHost, C: Clock>(
    mut host: H,
    config: &SoundboardConfig,
    clock: C,
) -> AudioResult<AudioSystem<H>> {
    let sample_rate = host.operating_sample_rate();
    let buffer_size = host.buffer_size();
    let latency_ms = host.latency_ms();

    let registry = std::sync::Arc::new(VoiceRegistry::new(sample_rate));
    let mixer = VoiceMixer::new(registry.snapshot_cell());
    let soundboard = Soundboard::new(registry, config.resample_quality, config.default_gain);

    let mut keep_alive = None;
    let mut keep_alive_events = None;
    let monitor = if !config.keep_alive.enabled {
        None
    } else if let Some(port) = host.input_port() {
        let (mut monitor, events) =
            KeepAliveMonitor::with_clock(clock, config.keep_alive.timeout());
        if config.keep_alive.any_non_zero {
            monitor.disable_sensitivity();
        } else {
            monitor.set_sensitivity_dbfs(config.keep_alive.sensitivity_dbfs);
        }
        log::info!(
            "Keep-alive monitoring '{}' (timeout: {}s, sensitivity: {:.1} dBFS)",
            port,
            config.keep_alive.timeout_seconds,
            monitor.sensitivity_dbfs()
        );
        keep_alive = Some(monitor.handle());
        keep_alive_events = Some(events);
        Some(monitor)
    } else {
        log::warn!("Keep-alive enabled but the audio host has no input port");
        None
    };

    let processor = SoundboardProcessor::new(mixer, monitor);
    host.register_process_callback(Box::new(processor))?;

    log::info!(
        "Soundboard attached to {:?} ({}Hz, {} frames, ~{:.1}ms)",
        host.output_ports(),
        sample_rate,
        buffer_size,
        latency_ms
    );

    Ok(AudioSystem {
        host,
        soundboard,
        keep_alive,
        keep_alive_events,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// Handle to the platform audio host
///
/// Keeps the audio streams/client alive. Drop this to stop audio.
pub enum AudioHandle {
    /// CPAL-based host (Windows/macOS/Linux fallback)
    #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
    Cpal(super::cpal_backend::CpalHost),

    /// Native JACK host (Linux with jack-backend feature)
    #[cfg(all(target_os = "linux", feature = "jack-backend"))]
    Jack(super::jack_backend::JackHost),
}

impl AudioHost for AudioHandle {
    fn operating_sample_rate(&self) -> u32 {
        match self {
            #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
            AudioHandle::Cpal(h) => h.operating_sample_rate(),
            #[cfg(all(target_os = "linux", feature = "jack-backend"))]
            AudioHandle::Jack(h) => h.operating_sample_rate(),
        }
    }

    fn buffer_size(&self) -> u32 {
        match self {
            #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
            AudioHandle::Cpal(h) => h.buffer_size(),
            #[cfg(all(target_os = "linux", feature = "jack-backend"))]
            AudioHandle::Jack(h) => h.buffer_size(),
        }
    }

    fn output_ports(&self) -> Vec<String> {
        match self {
            #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
            AudioHandle::Cpal(h) => h.output_ports(),
            #[cfg(all(target_os = "linux", feature = "jack-backend"))]
            AudioHandle::Jack(h) => h.output_ports(),
        }
    }

    fn input_port(&self) -> Option<String> {
        match self {
            #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
            AudioHandle::Cpal(h) => h.input_port(),
            #[cfg(all(target_os = "linux", feature = "jack-backend"))]
            AudioHandle::Jack(h) => h.input_port(),
        }
    }

    fn register_process_callback(
        &mut self,
        callback: Box<dyn ProcessCallback>,
    ) -> AudioResult<()> {
        match self {
            #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
            AudioHandle::Cpal(h) => h.register_process_callback(callback),
            #[cfg(all(target_os = "linux", feature = "jack-backend"))]
            AudioHandle::Jack(h) => h.register_process_callback(callback),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Platform-specific audio system startup
// ═══════════════════════════════════════════════════════════════════════════════

/// Start the audio system with the given configuration
///
/// Automatically selects the appropriate backend:
/// - **Linux with jack-backend feature**: Native JACK for pro-audio routing
/// - **Other platforms**: CPAL for cross-platform support
pub fn start_audio_system(config: &SoundboardConfig) -> AudioResult<AudioSystem> {
    let with_input = config.keep_alive.enabled;

    #[cfg(all(target_os = "linux", feature = "jack-backend"))]
    let handle = {
        let connections = config
            .audio
            .restore_connections
            .then(crate::config::default_connections_path);
        let mut host = super::jack_backend::JackHost::open(&config.client_name, with_input)?;
        host.set_connections_file(connections);
        host.set_auto_connect(
            config.audio.auto_connect_outputs,
            with_input && config.keep_alive.auto_connect_input,
        );
        AudioHandle::Jack(host)
    };

    #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
    let handle = AudioHandle::Cpal(super::cpal_backend::CpalHost::open(
        &config.audio,
        with_input,
    )?);

    attach_soundboard(handle, config)
}

/// Get available stereo output pairs
///
/// On JACK: Returns actual port pairs (e.g., "system 1-2", "Scarlett 3-4")
/// On CPAL: Returns devices as pseudo-pairs
pub fn get_available_stereo_pairs() -> Vec<StereoPair> {
    #[cfg(all(target_os = "linux", feature = "jack-backend"))]
    {
        super::jack_backend::get_available_stereo_pairs()
    }

    #[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
    {
        super::cpal_backend::get_available_stereo_pairs()
    }
}
