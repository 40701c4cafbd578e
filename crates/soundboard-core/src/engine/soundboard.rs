//! Control-plane facade for playing clips

use std::sync::Arc;

use super::{IngestError, PlaybackInfo, VoiceRegistry};
use crate::resample::{ResampleQuality, SampleRateConverter};
use crate::types::{AudioClip, Sample};

/// Gain used when a play request does not specify one
pub const DEFAULT_GAIN: f32 = 0.8;

/// What a successful play request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new voice was admitted
    Started,
    /// Voices with the same id were rewound instead of stacking another
    Restarted,
}

/// Play requests in, voices out
///
/// Owns the ingestion path (validate, convert, admit) in front of a shared
/// [`VoiceRegistry`]. Cheap to share behind an `Arc`; every method takes
/// `&self`.
pub struct Soundboard {
    registry: Arc<VoiceRegistry>,
    converter: SampleRateConverter,
    default_gain: f32,
}

impl Soundboard {
    pub fn new(registry: Arc<VoiceRegistry>, quality: ResampleQuality, default_gain: f32) -> Self {
        let converter = SampleRateConverter::new(registry.sample_rate(), quality);
        Self {
            registry,
            converter,
            default_gain,
        }
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    pub fn sample_rate(&self) -> u32 {
        self.registry.sample_rate()
    }

    pub fn default_gain(&self) -> f32 {
        self.default_gain
    }

    pub fn set_default_gain(&mut self, gain: f32) {
        self.default_gain = gain;
    }

    /// Play interleaved `samples` recorded at `sample_rate`
    ///
    /// With an `id` that already has voices, those voices restart from
    /// frame 0 and keep their gain; nothing new is converted or added.
    /// `gain` falls back to the default gain.
    pub fn play(
        &self,
        samples: impl Into<Arc<[Sample]>>,
        sample_rate: u32,
        channels: usize,
        id: Option<&str>,
        gain: Option<f32>,
    ) -> Result<PlayOutcome, IngestError> {
        let clip = AudioClip::new(samples, sample_rate, channels)?;
        self.play_clip(&clip, id, gain)
    }

    /// Play an already validated clip
    pub fn play_clip(
        &self,
        clip: &AudioClip,
        id: Option<&str>,
        gain: Option<f32>,
    ) -> Result<PlayOutcome, IngestError> {
        if let Some(id) = id {
            if self.registry.restart_by_id(id) {
                log::debug!("Restarted voices for {:?}", id);
                return Ok(PlayOutcome::Restarted);
            }
        }

        let normalized = self.converter.convert(clip)?;
        self.registry
            .add_voice(&normalized, id, gain.unwrap_or(self.default_gain))?;
        Ok(PlayOutcome::Started)
    }

    /// Remove every voice
    pub fn stop_all(&self) {
        self.registry.clear();
        log::debug!("Stopped all voices");
    }

    /// Remove every voice whose id is in `ids`; returns how many ids matched
    pub fn stop_voices<S: AsRef<str>>(&self, ids: &[S]) -> usize {
        ids.iter()
            .filter(|id| self.registry.stop_by_id(id.as_ref()))
            .count()
    }

    /// Set the gain of every voice with `id`
    pub fn set_voice_gain(&self, id: &str, gain: f32) -> bool {
        self.registry.set_gain_by_id(id, gain)
    }

    pub fn playback_info(&self, id: &str) -> PlaybackInfo {
        self.registry.playback_info(id)
    }

    /// Number of voices currently visible to the mixer
    pub fn active_voices(&self) -> usize {
        self.registry.voice_count()
    }
}
