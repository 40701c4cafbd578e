//! Audio callback body shared by every backend

use super::VoiceMixer;
use crate::audio::ProcessCallback;
use crate::keepalive::{Clock, KeepAliveMonitor, SystemClock};
use crate::types::Sample;

/// Everything the real-time callback owns
///
/// The mixer fills the output ports from the current voice snapshot; the
/// keep-alive monitor (when enabled) scans the single-channel input port
/// independently of the output path.
pub struct SoundboardProcessor<C: Clock = SystemClock> {
    mixer: VoiceMixer,
    keep_alive: Option<KeepAliveMonitor<C>>,
}

impl<C: Clock> SoundboardProcessor<C> {
    pub fn new(mixer: VoiceMixer, keep_alive: Option<KeepAliveMonitor<C>>) -> Self {
        Self { mixer, keep_alive }
    }

    /// Process one host cycle
    ///
    /// `frame_count` is taken from the first output port. `input`, if the
    /// host provides one, is a mono buffer of the same cycle.
    pub fn process(&mut self, outputs: &mut [&mut [Sample]], input: Option<&[Sample]>) {
        let frame_count = outputs.first().map(|o| o.len()).unwrap_or(0);
        self.mixer.process(outputs, frame_count);

        if let (Some(monitor), Some(input)) = (self.keep_alive.as_mut(), input) {
            monitor.process_input_samples(input, input.len(), 1);
        }
    }

    /// Feed input to the keep-alive monitor without producing output
    ///
    /// Used for injected test input and hosts whose input arrives apart
    /// from the output cycle.
    pub fn process_input(&mut self, samples: &[Sample], frame_count: usize, channel_count: usize) {
        if let Some(monitor) = self.keep_alive.as_mut() {
            monitor.process_input_samples(samples, frame_count, channel_count);
        }
    }

    pub fn keep_alive(&self) -> Option<&KeepAliveMonitor<C>> {
        self.keep_alive.as_ref()
    }
}

impl<C: Clock> ProcessCallback for SoundboardProcessor<C> {
    fn process(&mut self, outputs: &mut [&mut [Sample]], input: Option<&[Sample]>) {
        SoundboardProcessor::process(self, outputs, input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::VoiceRegistry;
    use crate::keepalive::ManualClock;
    use crate::types::AudioClip;
    use std::time::Duration;

    #[test]
    fn test_processor_mixes_and_monitors_independently() {
        let registry = VoiceRegistry::new(48000);
        let clock = ManualClock::new();
        let (monitor, mut rx) =
            KeepAliveMonitor::with_clock(clock.clone(), Duration::from_millis(100));
        let mut processor =
            SoundboardProcessor::new(VoiceMixer::new(registry.snapshot_cell()), Some(monitor));

        let clip = AudioClip::new(vec![0.5; 32], 48000, 1).unwrap();
        registry.add_voice(&clip, None, 1.0).unwrap();

        let mut left = vec![0.0; 16];
        let mut right = vec![0.0; 16];
        let silent_input = vec![0.0; 16];

        clock.advance(Duration::from_millis(150));
        {
            let mut outputs = [left.as_mut_slice(), right.as_mut_slice()];
            processor.process(&mut outputs, Some(silent_input.as_slice()));
        }

        // Output carries the voice, input was silent: keep-alive fires
        assert!(left.iter().all(|&s| s == 0.5));
        assert!(rx.try_recv().is_some());
    }

    #[test]
    fn test_processor_without_monitor_ignores_input() {
        let registry = VoiceRegistry::new(48000);
        let mut processor: SoundboardProcessor =
            SoundboardProcessor::new(VoiceMixer::new(registry.snapshot_cell()), None);

        let mut left = vec![1.0; 8];
        let mut right = vec![1.0; 8];
        let mut outputs = [left.as_mut_slice(), right.as_mut_slice()];
        let input = [0.0f32; 8];
        processor.process(&mut outputs, Some(&input[..]));
        processor.process_input(&[0.0; 8], 8, 1);
        assert!(processor.keep_alive().is_none());
        assert!(outputs[0].iter().all(|&s| s == 0.0));
    }
}
