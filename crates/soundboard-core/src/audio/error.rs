//! Audio backend error types

use thiserror::Error;

/// Errors that can occur while bringing up or driving an audio host
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Audio server client could not be created or activated
    #[error("Audio client error: {0}")]
    ClientError(String),

    /// Port registration failed
    #[error("Failed to register port '{port}': {reason}")]
    PortRegistration { port: String, reason: String },

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Unsupported sample format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// A host drives exactly one process callback
    #[error("A process callback is already registered with this host")]
    CallbackAlreadyRegistered,
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
