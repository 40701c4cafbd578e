//! Audio engine - voices, snapshot registry, real-time mixer
//!
//! This module contains the playback core of the soundboard:
//! - Voice: one in-flight playback instance with atomic cursor and gain
//! - VoiceRegistry: control-plane store that publishes immutable snapshots
//! - VoiceMixer: runs inside the audio callback, sums the current snapshot
//! - SoundboardProcessor: the callback body (mixer + keep-alive input)
//! - Soundboard: control-plane facade (validate, resample, restart-or-add)
//!
//! # Threading
//!
//! ```text
//! ┌──────────────────┐  lock + copy-on-write   ┌─────────────────────┐
//! │  Control plane   │────────────────────────►│  SharedCell<Snapshot>│
//! │ (UI, tests, SRC) │     atomic publish      │  (basedrop)          │
//! └──────────────────┘                         └──────────┬──────────┘
//!         ▲                                               │ get() (no lock)
//!         │ gain: atomic store                            ▼
//! ┌──────────────────┐                         ┌─────────────────────┐
//! │   Voice atomics  │◄────────────────────────│  Audio RT thread    │
//! │  (cursor, gain)  │     cursor: atomic store │  (VoiceMixer)       │
//! └──────────────────┘                         └─────────────────────┘
//! ```

mod error;
mod gc;
mod mixer;
mod processor;
mod registry;
mod soundboard;
mod voice;

pub use error::IngestError;
pub use mixer::*;
pub use processor::*;
pub use registry::*;
pub use soundboard::*;
pub use voice::*;

pub(crate) use gc::Reclaimer;
