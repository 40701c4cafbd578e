//! Ingestion error types

use thiserror::Error;

/// Errors raised on the control plane before a voice is admitted
///
/// None of these can occur on the real-time path: a voice only becomes
/// visible to the mixer after ingestion has fully succeeded.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Zero channels
    #[error("Invalid channel count: a clip needs at least one channel")]
    InvalidChannelCount,

    /// No whole frame of audio
    #[error("Empty audio buffer")]
    EmptyBuffer,

    /// Zero source sample rate
    #[error("Invalid source sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    /// Clip handed to the registry was not normalized to the operating rate
    #[error("Sample rate mismatch: engine runs at {expected}Hz, clip is {actual}Hz")]
    RateMismatch { expected: u32, actual: u32 },

    /// Sample rate conversion failed; nothing was admitted
    #[error("Sample rate conversion failed: {0}")]
    Resampler(String),
}
