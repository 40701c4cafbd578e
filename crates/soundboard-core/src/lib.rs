//! Soundboard Core - real-time voice mixing and silence keep-alive
//!
//! - [`engine`]: voices, snapshot registry, real-time mixer, play facade
//! - [`resample`]: ingestion-time sample rate conversion
//! - [`keepalive`]: input silence detection with a repeating trigger
//! - [`audio`]: host capability interface and JACK/CPAL/offline hosts
//! - [`config`]: YAML configuration and standard file locations

pub mod audio;
pub mod config;
pub mod engine;
pub mod keepalive;
pub mod resample;
pub mod types;

pub use types::*;
