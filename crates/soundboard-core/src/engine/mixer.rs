//! Mixer - sums every voice of the current snapshot into the output ports
//!
//! Runs inside the audio callback. Per invocation:
//! 1. Zero every output buffer
//! 2. Load the current snapshot (no lock, no allocation)
//! 3. Sum each voice, mono duplicated to L/R, extra channels skipped,
//!    scaled by the voice gain, advancing the voice cursor
//! 4. Hard-clip the summed output to [-1.0, 1.0]
//!
//! Clipping happens after all voices are summed, never per voice.

use std::sync::Arc;

use super::{SnapshotCell, Voice};
use crate::types::Sample;

/// Real-time voice mixer
///
/// Holds only the shared snapshot handle; it never touches the registry
/// mutex and never mutates the voice list.
pub struct VoiceMixer {
    snapshot: Arc<SnapshotCell>,
}

impl VoiceMixer {
    pub fn new(snapshot: Arc<SnapshotCell>) -> Self {
        Self { snapshot }
    }

    /// Fill `outputs` with `frame_count` frames of mixed audio
    ///
    /// `outputs[0]` receives left, `outputs[1]` right; further ports stay
    /// silent. Buffers shorter than `frame_count` are filled to their length.
    /// Never blocks, allocates or panics.
    pub fn process(&self, outputs: &mut [&mut [Sample]], frame_count: usize) {
        for out in outputs.iter_mut() {
            let n = frame_count.min(out.len());
            out[..n].fill(0.0);
        }

        let snapshot = self.snapshot.get();
        if snapshot.is_empty() || outputs.is_empty() {
            return;
        }

        for voice in snapshot.iter() {
            mix_voice(voice, outputs, frame_count);
        }

        for out in outputs.iter_mut() {
            let n = frame_count.min(out.len());
            for sample in &mut out[..n] {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }
}

/// Accumulate one voice into the outputs and advance its cursor
#[inline]
fn mix_voice(voice: &Voice, outputs: &mut [&mut [Sample]], frame_count: usize) {
    let buffer = voice.buffer();
    let channels = voice.channels();
    let len = buffer.len();
    let mut pos = voice.cursor();

    // Inconsistent voices contribute silence
    if channels == 0 || pos >= len {
        return;
    }

    let gain = voice.gain();

    for i in 0..frame_count {
        if pos >= len {
            break;
        }

        let (left, right) = if channels == 1 {
            let s = buffer[pos];
            pos += 1;
            (s, s)
        } else {
            let left = buffer[pos];
            let right = buffer.get(pos + 1).copied().unwrap_or(0.0);
            // Skip any channels beyond the first two
            pos = (pos + channels).min(len);
            (left, right)
        };

        if let Some(out) = outputs.get_mut(0) {
            if let Some(s) = out.get_mut(i) {
                *s += left * gain;
            }
        }
        if let Some(out) = outputs.get_mut(1) {
            if let Some(s) = out.get_mut(i) {
                *s += right * gain;
            }
        }
    }

    voice.store_cursor(pos);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VoiceRegistry;
    use crate::types::AudioClip;

    const RATE: u32 = 48000;

    fn setup() -> (VoiceRegistry, VoiceMixer) {
        let registry = VoiceRegistry::new(RATE);
        let mixer = VoiceMixer::new(registry.snapshot_cell());
        (registry, mixer)
    }

    fn render(mixer: &VoiceMixer, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![9.0; frames];
        let mut right = vec![9.0; frames];
        {
            let mut outputs = [left.as_mut_slice(), right.as_mut_slice()];
            mixer.process(&mut outputs, frames);
        }
        (left, right)
    }

    #[test]
    fn test_empty_snapshot_outputs_silence() {
        let (_registry, mixer) = setup();
        let (left, right) = render(&mixer, 64);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_mono_voice_plays_unchanged() {
        let (registry, mixer) = setup();
        let clip = AudioClip::new(vec![0.5; 100], RATE, 1).unwrap();
        registry.add_voice(&clip, Some("x"), 1.0).unwrap();

        let (left, right) = render(&mixer, 50);
        assert!(left.iter().all(|&s| s == 0.5));
        assert!(right.iter().all(|&s| s == 0.5));

        let info = registry.playback_info("x");
        assert!(info.found);
        assert_eq!(info.current_frame, 50);
        assert_eq!(info.total_frames, 100);
    }

    #[test]
    fn test_restart_replays_from_start() {
        let (registry, mixer) = setup();
        let ramp: Vec<f32> = (0..100).map(|i| i as f32 / 100.0).collect();
        let clip = AudioClip::new(ramp.clone(), RATE, 1).unwrap();
        registry.add_voice(&clip, Some("x"), 1.0).unwrap();

        render(&mixer, 50);
        assert!(registry.restart_by_id("x"));

        let (left, _) = render(&mixer, 10);
        assert_eq!(left, ramp[0..10].to_vec());
    }

    #[test]
    fn test_stereo_and_multichannel_mapping() {
        let (registry, mixer) = setup();
        // 3 channels: L, R, and a third channel that must be skipped
        let clip = AudioClip::new(vec![0.1, 0.2, 0.9, 0.3, 0.4, 0.9], RATE, 3).unwrap();
        registry.add_voice(&clip, None, 1.0).unwrap();

        let (left, right) = render(&mixer, 4);
        assert_eq!(left, vec![0.1, 0.3, 0.0, 0.0]);
        assert_eq!(right, vec![0.2, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn test_gain_is_applied() {
        let (registry, mixer) = setup();
        let clip = AudioClip::new(vec![0.5, -0.5], RATE, 2).unwrap();
        registry.add_voice(&clip, Some("g"), 0.5).unwrap();

        let (left, right) = render(&mixer, 1);
        assert_eq!(left[0], 0.25);
        assert_eq!(right[0], -0.25);
    }

    #[test]
    fn test_clip_after_sum() {
        let (registry, mixer) = setup();
        let clip = AudioClip::new(vec![1.0; 8], RATE, 1).unwrap();
        registry.add_voice(&clip, None, 0.6).unwrap();
        registry.add_voice(&clip, None, 0.6).unwrap();

        let (left, right) = render(&mixer, 8);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 1.0));
    }

    #[test]
    fn test_clip_does_not_happen_per_voice() {
        let (registry, mixer) = setup();
        // +1.5 and -1.0: per-voice clipping would give 0.0, summing first gives 0.5
        let hot = AudioClip::new(vec![1.5; 4], RATE, 1).unwrap();
        let neg = AudioClip::new(vec![-1.0; 4], RATE, 1).unwrap();
        registry.add_voice(&hot, None, 1.0).unwrap();
        registry.add_voice(&neg, None, 1.0).unwrap();

        let (left, _) = render(&mixer, 4);
        assert!(left.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_output_always_within_range() {
        let (registry, mixer) = setup();
        let loud = AudioClip::new(vec![0.9, -0.9, 0.7, -0.7], RATE, 2).unwrap();
        for _ in 0..16 {
            registry.add_voice(&loud, None, 3.0).unwrap();
        }
        let (left, right) = render(&mixer, 2);
        assert!(left.iter().chain(right.iter()).all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_finished_voice_stays_registered() {
        let (registry, mixer) = setup();
        let clip = AudioClip::new(vec![0.5; 4], RATE, 1).unwrap();
        registry.add_voice(&clip, Some("x"), 1.0).unwrap();

        let (left, _) = render(&mixer, 8);
        assert_eq!(left, vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);

        let (left, _) = render(&mixer, 8);
        assert!(left.iter().all(|&s| s == 0.0));
        assert_eq!(registry.voice_count(), 1);
        assert_eq!(registry.playback_info("x").current_frame, 4);
    }

    #[test]
    fn test_mixing_is_deterministic() {
        let samples: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();
        let clip = AudioClip::new(samples, RATE, 2).unwrap();

        let run = || {
            let (registry, mixer) = setup();
            registry.add_voice(&clip, Some("a"), 0.7).unwrap();
            registry.add_voice(&clip, Some("b"), 0.4).unwrap();
            render(&mixer, 32)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_mixer_runs_while_registry_mutates() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        const MAX_VOICES: usize = 8;

        let registry = Arc::new(VoiceRegistry::new(RATE));
        let mixer = VoiceMixer::new(registry.snapshot_cell());
        let done = Arc::new(AtomicBool::new(false));

        let audio = {
            let done = Arc::clone(&done);
            let snapshot = registry.snapshot_cell();
            thread::spawn(move || {
                let mut left = vec![0.0f32; 64];
                let mut right = vec![0.0f32; 64];
                let mut cycles = 0usize;
                while !done.load(Ordering::Acquire) || cycles == 0 {
                    {
                        let mut outputs = [left.as_mut_slice(), right.as_mut_slice()];
                        mixer.process(&mut outputs, 64);
                    }
                    assert!(left.iter().chain(right.iter()).all(|s| (-1.0..=1.0).contains(s)));
                    assert!(snapshot.get().len() <= MAX_VOICES);
                    cycles += 1;
                }
                cycles
            })
        };

        let loud = AudioClip::new(vec![0.9; 4096], RATE, 1).unwrap();
        let stereo = AudioClip::new(vec![-0.7; 4096], RATE, 2).unwrap();
        let ids = ["a", "b", "c", "d"];
        for i in 0..3000 {
            let id = ids[i % ids.len()];
            match i % 5 {
                0 | 1 if registry.voice_count() < MAX_VOICES => {
                    let clip = if i % 2 == 0 { &loud } else { &stereo };
                    registry.add_voice(clip, Some(id), 1.5).unwrap();
                }
                2 => {
                    registry.restart_by_id(id);
                }
                3 => {
                    registry.set_gain_by_id(id, (i % 7) as f32 * 0.5);
                }
                4 => {
                    registry.stop_by_id(id);
                }
                _ => registry.clear(),
            }
        }

        done.store(true, Ordering::Release);
        let cycles = audio.join().unwrap();
        assert!(cycles > 0);

        registry.clear();
        registry.collect_garbage();
        assert_eq!(registry.voice_count(), 0);
    }

    #[test]
    fn test_short_output_buffers_are_safe() {
        let (registry, mixer) = setup();
        let clip = AudioClip::new(vec![0.5; 16], RATE, 1).unwrap();
        registry.add_voice(&clip, None, 1.0).unwrap();

        let mut left = vec![0.0; 4];
        let mut outputs = [left.as_mut_slice()];
        mixer.process(&mut outputs, 8);
        assert_eq!(left, vec![0.5; 4]);
    }
}
