//! Voice registry and snapshot publisher
//!
//! The registry owns the mutable list of voices behind a mutex. Every
//! structural change builds a brand-new snapshot (copy-on-write) and swaps
//! it into a `basedrop::SharedCell`. The audio thread only ever calls
//! `SharedCell::get`, which never takes the mutex, so it always observes
//! either the fully-old or the fully-new voice list.
//!
//! Per-voice `cursor` and `gain` are atomics and do not require a republish.
//! Gain changes still republish, matching the engine's established
//! behaviour (see `set_gain_by_id`).

use std::sync::{Arc, Mutex, MutexGuard};

use basedrop::{Shared, SharedCell};

use super::{IngestError, Reclaimer, Voice};
use crate::types::AudioClip;

/// Immutable, ordered view of all active voices
pub struct VoiceSnapshot {
    voices: Vec<Shared<Voice>>,
}

impl VoiceSnapshot {
    fn empty() -> Self {
        Self { voices: Vec::new() }
    }

    /// Voices in registry order
    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().map(|v| &**v)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// The atomically swapped snapshot handle shared with the mixer
pub type SnapshotCell = SharedCell<VoiceSnapshot>;

/// Position query result for a voice id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackInfo {
    /// Whether a voice with the id is in the current snapshot
    pub found: bool,
    /// Current position in frames (not interleaved samples)
    pub current_frame: u64,
    /// Operating sample rate of the voice
    pub sample_rate: u32,
    /// Length of the voice's buffer in frames
    pub total_frames: u64,
}

/// State guarded by the registry mutex
struct RegistryInner {
    voices: Vec<Shared<Voice>>,
    reclaimer: Reclaimer,
}

/// Control-plane store of active voices
///
/// All methods may block briefly on the internal mutex and are meant for
/// ordinary threads. The real-time side reads through [`VoiceRegistry::snapshot_cell`].
pub struct VoiceRegistry {
    inner: Mutex<RegistryInner>,
    snapshot: Arc<SnapshotCell>,
    sample_rate: u32,
}

impl VoiceRegistry {
    /// Create an empty registry for the given operating sample rate
    pub fn new(sample_rate: u32) -> Self {
        let reclaimer = Reclaimer::new();
        let snapshot = Arc::new(SharedCell::new(reclaimer.share(VoiceSnapshot::empty())));
        Self {
            inner: Mutex::new(RegistryInner {
                voices: Vec::new(),
                reclaimer,
            }),
            snapshot,
            sample_rate,
        }
    }

    /// Operating sample rate voices must already be normalized to
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Shared snapshot handle for the real-time mixer
    pub fn snapshot_cell(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshot)
    }

    /// Current snapshot (lock-free)
    pub fn snapshot(&self) -> Shared<VoiceSnapshot> {
        self.snapshot.get()
    }

    /// Number of voices in the current snapshot
    pub fn voice_count(&self) -> usize {
        self.snapshot.get().len()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // A panic while holding the lock cannot leave the voice list torn:
        // every mutation is a single push/retain/clear.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Build a fresh snapshot from the private list and swap it in
    fn publish(&self, inner: &mut RegistryInner) {
        let next = inner.reclaimer.share(VoiceSnapshot {
            voices: inner.voices.clone(),
        });
        let previous = self.snapshot.replace(next);
        drop(previous);
        inner.reclaimer.collect();
    }

    /// Append a voice for `clip` starting at frame 0
    ///
    /// The clip must already be at the operating rate; conversion is the
    /// caller's job (see [`crate::resample::SampleRateConverter`]).
    pub fn add_voice(
        &self,
        clip: &AudioClip,
        id: Option<&str>,
        gain: f32,
    ) -> Result<(), IngestError> {
        if clip.sample_rate() != self.sample_rate {
            return Err(IngestError::RateMismatch {
                expected: self.sample_rate,
                actual: clip.sample_rate(),
            });
        }

        let mut inner = self.lock();
        let voice = inner.reclaimer.share(Voice::new(clip, id, gain));
        inner.voices.push(voice);
        self.publish(&mut inner);

        log::debug!(
            "Voice added (id: {:?}, frames: {}, gain: {:.2}, active: {})",
            id,
            clip.frames(),
            gain,
            inner.voices.len()
        );
        Ok(())
    }

    /// Rewind every voice in group `id` to frame 0
    ///
    /// Returns whether any voice matched. An empty id never matches.
    pub fn restart_by_id(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let mut restarted = false;
        for voice in inner.voices.iter().filter(|v| v.matches(id)) {
            voice.restart();
            restarted = true;
        }
        if restarted {
            self.publish(&mut inner);
        }
        restarted
    }

    /// Remove every voice in group `id`
    ///
    /// Returns whether any voice was removed. An empty id never matches.
    pub fn stop_by_id(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let before = inner.voices.len();
        inner.voices.retain(|v| !v.matches(id));
        let removed = inner.voices.len() != before;
        if removed {
            self.publish(&mut inner);
            log::debug!("Stopped {} voice(s) with id {:?}", before - inner.voices.len(), id);
        }
        removed
    }

    /// Set the gain of every voice in group `id`
    ///
    /// Gain is an atomic field, so the mixer would see it without a new
    /// snapshot. A snapshot is republished anyway whenever something matched.
    pub fn set_gain_by_id(&self, id: &str, gain: f32) -> bool {
        let mut inner = self.lock();
        let mut changed = false;
        for voice in inner.voices.iter().filter(|v| v.matches(id)) {
            voice.set_gain(gain);
            changed = true;
        }
        if changed {
            self.publish(&mut inner);
        }
        changed
    }

    /// Drop all voices and publish an empty snapshot
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.voices.clear();
        self.publish(&mut inner);
    }

    /// Position of the first voice in group `id` (lock-free)
    pub fn playback_info(&self, id: &str) -> PlaybackInfo {
        let snapshot = self.snapshot.get();
        let info = snapshot
            .iter()
            .find(|v| v.matches(id))
            .map(|v| PlaybackInfo {
                found: true,
                current_frame: v.current_frame(),
                sample_rate: self.sample_rate,
                total_frames: v.total_frames(),
            })
            .unwrap_or_default();
        info
    }

    /// Release snapshots and voices retired since the last mutation
    pub fn collect_garbage(&self) {
        self.lock().reclaimer.collect();
    }
}
