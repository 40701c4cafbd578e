//! Audio hosts for the soundboard
//!
//! The engine only needs an [`AudioHost`]: an operating sample rate, logical
//! ports and one process callback slot. Platform hosts:
//! - **Linux**: Native JACK with port routing and connection persistence
//!   (with `jack-backend` feature)
//! - **Windows/macOS**: CPAL, with an optional input stream for keep-alive
//! - **Anywhere**: [`OfflineHost`], rendered by hand (tests, headless use)
//!
//! # Example Usage
//!
//! ```ignore
//! use soundboard_core::audio::start_audio_system;
//! use soundboard_core::config::SoundboardConfig;
//!
//! let system = start_audio_system(&SoundboardConfig::default())?;
//! system.soundboard.play(samples, 44100, 2, Some("airhorn"), None)?;
//!
//! // Keep-alive triggers arrive on the control plane
//! if let Some(events) = system.keep_alive_events.as_mut() {
//!     while let Some(event) = events.try_recv() { /* replay something */ }
//! }
//! ```

mod backend;
mod config;
mod connections;
mod device;
mod error;
mod offline;

// Platform-specific backends
#[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
mod cpal_backend;

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
mod jack_backend;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
};

pub use backend::{
    attach_soundboard, attach_soundboard_with_clock, get_available_stereo_pairs,
    start_audio_system, AudioHandle, AudioHost, AudioSystem, ProcessCallback, StereoPair,
};

pub use connections::{
    format_connections, load_connections, parse_connections, rename_client, save_connections,
    PortConnections,
};

pub use device::{
    find_device_by_id, find_input_device_by_id, get_available_output_devices,
    get_cpal_default_device, get_output_devices, AudioDevice,
};

pub use error::{AudioError, AudioResult};
pub use offline::OfflineHost;

#[cfg(not(all(target_os = "linux", feature = "jack-backend")))]
pub use cpal_backend::CpalHost;

#[cfg(all(target_os = "linux", feature = "jack-backend"))]
pub use jack_backend::JackHost;
