//! Cross-thread control and trigger delivery for the keep-alive monitor
//!
//! - **Control plane → monitor**: sensitivity and reset requests via atomics
//! - **Monitor → control plane**: diagnostics via atomics, triggers via a
//!   bounded `rtrb` SPSC queue
//!
//! Pushing a trigger never blocks. If the control plane has not drained the
//! queue and it is full, the event is dropped and counted.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::monitor::dbfs_to_amplitude;

/// Pending trigger capacity; triggers are at least one timeout apart
const TRIGGER_QUEUE_CAPACITY: usize = 16;

/// One keep-alive trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveEvent {
    /// 1-based count of triggers raised by this monitor
    pub sequence: u64,
    /// Silence observed when the trigger fired
    pub silence: Duration,
}

/// Atomics shared between the monitor and its handles
#[derive(Debug)]
pub(crate) struct KeepAliveShared {
    /// Peak threshold as f32 bits; 0.0 selects any-non-zero mode
    threshold: AtomicU32,
    reset_requested: AtomicBool,
    last_frame_had_sound: AtomicBool,
    silence_ms: AtomicU64,
    triggers: AtomicU64,
    dropped_triggers: AtomicU64,
}

impl KeepAliveShared {
    pub(crate) fn new(threshold: f32) -> Self {
        Self {
            threshold: AtomicU32::new(threshold.to_bits()),
            reset_requested: AtomicBool::new(false),
            last_frame_had_sound: AtomicBool::new(false),
            silence_ms: AtomicU64::new(0),
            triggers: AtomicU64::new(0),
            dropped_triggers: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold.load(Ordering::Relaxed))
    }

    #[inline]
    pub(crate) fn set_threshold(&self, amplitude: f32) {
        self.threshold.store(amplitude.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn take_reset_request(&self) -> bool {
        self.reset_requested.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn publish(&self, last_frame_had_sound: bool, silence: Duration) {
        self.last_frame_had_sound
            .store(last_frame_had_sound, Ordering::Relaxed);
        self.silence_ms
            .store(silence.as_millis() as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn next_trigger_sequence(&self) -> u64 {
        self.triggers.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub(crate) fn count_dropped_trigger(&self) {
        self.dropped_triggers.fetch_add(1, Ordering::Relaxed);
    }
}

/// Control-plane handle to a monitor running on another thread
///
/// Cheap to clone; every method is a relaxed atomic access.
#[derive(Debug, Clone)]
pub struct KeepAliveHandle {
    pub(crate) shared: Arc<KeepAliveShared>,
}

impl KeepAliveHandle {
    /// Set the peak threshold from dBFS (clamped to [0, 1] linear)
    pub fn set_sensitivity_dbfs(&self, dbfs: f64) {
        self.shared.set_threshold(dbfs_to_amplitude(dbfs));
    }

    /// Treat any non-zero sample as sound
    pub fn disable_sensitivity(&self) {
        self.shared.set_threshold(0.0);
    }

    pub fn sensitivity_enabled(&self) -> bool {
        self.shared.threshold() > 0.0
    }

    /// Configured sensitivity in dBFS, `-inf` when disabled
    pub fn sensitivity_dbfs(&self) -> f64 {
        let threshold = self.shared.threshold();
        if threshold <= 0.0 {
            f64::NEG_INFINITY
        } else {
            20.0 * (threshold as f64).log10()
        }
    }

    /// Ask the monitor to restart its silence timer on its next batch
    pub fn request_reset(&self) {
        self.shared.reset_requested.store(true, Ordering::Release);
    }

    /// Whether the final frame of the last processed batch had sound
    pub fn last_frame_had_sound(&self) -> bool {
        self.shared.last_frame_had_sound.load(Ordering::Relaxed)
    }

    /// Silence duration as of the last processed batch, in seconds
    pub fn silence_duration_seconds(&self) -> f64 {
        self.shared.silence_ms.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Total triggers raised so far
    pub fn trigger_count(&self) -> u64 {
        self.shared.triggers.load(Ordering::Relaxed)
    }

    /// Triggers lost because the queue was full
    pub fn dropped_triggers(&self) -> u64 {
        self.shared.dropped_triggers.load(Ordering::Relaxed)
    }
}

/// Control-plane end of the trigger queue
pub struct KeepAliveReceiver {
    consumer: rtrb::Consumer<KeepAliveEvent>,
}

impl KeepAliveReceiver {
    /// Next pending trigger, if any (non-blocking)
    pub fn try_recv(&mut self) -> Option<KeepAliveEvent> {
        self.consumer.pop().ok()
    }

    /// Drain all pending triggers, returning the most recent one
    pub fn drain_latest(&mut self) -> Option<KeepAliveEvent> {
        let mut latest = None;
        while let Some(event) = self.try_recv() {
            latest = Some(event);
        }
        latest
    }

    /// Number of triggers waiting
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }
}

/// Create the bounded trigger queue
pub(crate) fn keep_alive_channel() -> (rtrb::Producer<KeepAliveEvent>, KeepAliveReceiver) {
    let (producer, consumer) = rtrb::RingBuffer::new(TRIGGER_QUEUE_CAPACITY);
    (producer, KeepAliveReceiver { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> KeepAliveHandle {
        KeepAliveHandle {
            shared: Arc::new(KeepAliveShared::new(0.001)),
        }
    }

    #[test]
    fn test_sensitivity_roundtrip() {
        let handle = handle();
        handle.set_sensitivity_dbfs(-40.0);
        assert!(handle.sensitivity_enabled());
        assert!((handle.sensitivity_dbfs() - (-40.0)).abs() < 1e-3);

        handle.disable_sensitivity();
        assert!(!handle.sensitivity_enabled());
        assert_eq!(handle.sensitivity_dbfs(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_reset_request_is_taken_once() {
        let handle = handle();
        handle.request_reset();
        assert!(handle.shared.take_reset_request());
        assert!(!handle.shared.take_reset_request());
    }

    #[test]
    fn test_receiver_drain_latest() {
        let (mut tx, mut rx) = keep_alive_channel();
        for sequence in 1..=3 {
            tx.push(KeepAliveEvent {
                sequence,
                silence: Duration::from_secs(1),
            })
            .unwrap();
        }
        assert_eq!(rx.pending(), 3);
        assert_eq!(rx.drain_latest().map(|e| e.sequence), Some(3));
        assert!(rx.try_recv().is_none());
    }
}
