//! Offline host - runs the process callback on demand
//!
//! No device, no thread: [`OfflineHost::render`] calls the registered
//! callback in `buffer_size` blocks from the caller's thread. Used for
//! tests and for rendering without audio hardware.

use super::backend::{AudioHost, ProcessCallback};
use super::error::{AudioError, AudioResult};
use crate::types::Sample;

const OUT_LEFT: &str = "offline:out_l";
const OUT_RIGHT: &str = "offline:out_r";
const KEEPALIVE_IN: &str = "offline:keepalive_in";

pub struct OfflineHost {
    sample_rate: u32,
    buffer_size: u32,
    has_input: bool,
    callback: Option<Box<dyn ProcessCallback>>,
    /// Per-block scratch, allocated once
    left: Vec<Sample>,
    right: Vec<Sample>,
    input: Vec<Sample>,
}

impl OfflineHost {
    pub fn new(sample_rate: u32, buffer_size: u32) -> Self {
        let block = buffer_size.max(1) as usize;
        Self {
            sample_rate,
            buffer_size: buffer_size.max(1),
            has_input: false,
            callback: None,
            left: vec![0.0; block],
            right: vec![0.0; block],
            input: vec![0.0; block],
        }
    }

    /// Expose a keep-alive input port
    pub fn with_input(mut self) -> Self {
        self.has_input = true;
        self
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Run `frames` frames through the callback, returning (left, right)
    ///
    /// `input` is mono and zero-padded if shorter than `frames`; it is
    /// ignored when the host has no input port. Without a callback the
    /// output is silence.
    pub fn render(
        &mut self,
        frames: usize,
        input: Option<&[Sample]>,
    ) -> (Vec<Sample>, Vec<Sample>) {
        let mut out_left = Vec::with_capacity(frames);
        let mut out_right = Vec::with_capacity(frames);
        let block = self.buffer_size as usize;
        let input = if self.has_input { input } else { None };

        let mut pos = 0;
        while pos < frames {
            let n = block.min(frames - pos);

            let block_input = match input {
                Some(samples) => {
                    let start = pos.min(samples.len());
                    let available = (samples.len() - start).min(n);
                    self.input[..available].copy_from_slice(&samples[start..start + available]);
                    self.input[available..n].fill(0.0);
                    Some(&self.input[..n])
                }
                None => None,
            };

            match self.callback.as_mut() {
                Some(callback) => {
                    let mut outputs = [&mut self.left[..n], &mut self.right[..n]];
                    callback.process(&mut outputs, block_input);
                }
                None => {
                    self.left[..n].fill(0.0);
                    self.right[..n].fill(0.0);
                }
            }

            out_left.extend_from_slice(&self.left[..n]);
            out_right.extend_from_slice(&self.right[..n]);
            pos += n;
        }

        (out_left, out_right)
    }
}

impl AudioHost for OfflineHost {
    fn operating_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn output_ports(&self) -> Vec<String> {
        vec![OUT_LEFT.to_string(), OUT_RIGHT.to_string()]
    }

    fn input_port(&self) -> Option<String> {
        self.has_input.then(|| KEEPALIVE_IN.to_string())
    }

    fn register_process_callback(
        &mut self,
        callback: Box<dyn ProcessCallback>,
    ) -> AudioResult<()> {
        if self.callback.is_some() {
            return Err(AudioError::CallbackAlreadyRegistered);
        }
        self.callback = Some(callback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes the block length into every output sample and records input
    struct Probe {
        seen_input: std::sync::Arc<std::sync::Mutex<Vec<f32>>>,
    }

    impl ProcessCallback for Probe {
        fn process(&mut self, outputs: &mut [&mut [Sample]], input: Option<&[Sample]>) {
            for out in outputs.iter_mut() {
                let n = out.len() as f32;
                out.fill(n);
            }
            if let Some(input) = input {
                self.seen_input.lock().unwrap().extend_from_slice(input);
            }
        }
    }

    #[test]
    fn test_render_without_callback_is_silent() {
        let mut host = OfflineHost::new(48000, 32);
        let (left, right) = host.render(100, None);
        assert_eq!(left.len(), 100);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_splits_into_blocks_and_pads_input() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut host = OfflineHost::new(48000, 4).with_input();
        host.register_process_callback(Box::new(Probe {
            seen_input: seen.clone(),
        }))
        .unwrap();

        let (left, _) = host.render(10, Some(&[1.0f32; 6][..]));
        assert_eq!(left, vec![4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 4.0, 2.0, 2.0]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert_eq!(&seen[..6], &[1.0; 6]);
        assert!(seen[6..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_ports() {
        let host = OfflineHost::new(48000, 64);
        assert_eq!(host.output_ports().len(), 2);
        assert_eq!(host.input_port(), None);
        assert_eq!(
            host.with_input().input_port().as_deref(),
            Some(KEEPALIVE_IN)
        );
    }
}
