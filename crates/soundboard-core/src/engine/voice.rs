//! Voice - one in-flight playback instance

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::types::{AudioClip, Sample};

/// One playing instance of a rate-normalized clip
///
/// The buffer is immutable and shared. The two mutable fields are
/// independent atomics:
/// - `cursor` is written only by the real-time mixer
/// - `gain` is written only by the control plane
///
/// Reaching the end of the buffer does not remove a voice; it keeps
/// contributing silence until the control plane stops it.
#[derive(Debug)]
pub struct Voice {
    /// Interleaved samples at the operating rate
    buffer: Arc<[Sample]>,
    /// Channels per frame in `buffer`
    channels: usize,
    /// Offset into `buffer` in samples (frame index * channels)
    cursor: AtomicUsize,
    /// Linear gain stored as f32 bits
    gain: AtomicU32,
    /// Optional group key for restart/stop/gain targeting
    id: Option<String>,
}

impl Voice {
    /// Create a voice positioned at the start of `clip`
    pub fn new(clip: &AudioClip, id: Option<&str>, gain: f32) -> Self {
        Self {
            buffer: clip.shared_samples(),
            channels: clip.channels(),
            cursor: AtomicUsize::new(0),
            gain: AtomicU32::new(gain.to_bits()),
            id: id.filter(|s| !s.is_empty()).map(str::to_owned),
        }
    }

    #[inline]
    pub fn buffer(&self) -> &[Sample] {
        &self.buffer
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True if this voice belongs to the (non-empty) group `id`
    #[inline]
    pub fn matches(&self, id: &str) -> bool {
        !id.is_empty() && self.id.as_deref() == Some(id)
    }

    /// Current cursor in samples (lock-free)
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn store_cursor(&self, cursor: usize) {
        self.cursor.store(cursor, Ordering::Release);
    }

    /// Rewind to the first frame
    pub fn restart(&self) {
        self.store_cursor(0);
    }

    /// Current gain (lock-free)
    #[inline]
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Acquire))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Release);
    }

    /// Current position in frames
    pub fn current_frame(&self) -> u64 {
        (self.cursor() / self.channels.max(1)) as u64
    }

    /// Total length in frames
    pub fn total_frames(&self) -> u64 {
        (self.buffer.len() / self.channels.max(1)) as u64
    }

    /// True once the cursor has consumed the whole buffer
    pub fn is_finished(&self) -> bool {
        self.cursor() >= self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_clip(frames: usize) -> AudioClip {
        AudioClip::new(vec![0.25; frames * 2], 48000, 2).unwrap()
    }

    #[test]
    fn test_voice_creation() {
        let voice = Voice::new(&stereo_clip(10), Some("kick"), 0.5);
        assert_eq!(voice.cursor(), 0);
        assert_eq!(voice.gain(), 0.5);
        assert_eq!(voice.id(), Some("kick"));
        assert_eq!(voice.total_frames(), 10);
        assert!(!voice.is_finished());
    }

    #[test]
    fn test_empty_id_is_anonymous() {
        let voice = Voice::new(&stereo_clip(4), Some(""), 1.0);
        assert_eq!(voice.id(), None);
        assert!(!voice.matches(""));
    }

    #[test]
    fn test_matches_requires_non_empty_id() {
        let voice = Voice::new(&stereo_clip(4), Some("x"), 1.0);
        assert!(voice.matches("x"));
        assert!(!voice.matches("y"));
        assert!(!voice.matches(""));
    }

    #[test]
    fn test_cursor_and_restart() {
        let voice = Voice::new(&stereo_clip(4), None, 1.0);
        voice.store_cursor(6);
        assert_eq!(voice.current_frame(), 3);
        voice.restart();
        assert_eq!(voice.current_frame(), 0);
    }
}
