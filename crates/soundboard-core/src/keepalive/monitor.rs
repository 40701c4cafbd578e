//! Keep-alive monitor - peak-threshold silence detector

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::control::{
    keep_alive_channel, KeepAliveEvent, KeepAliveHandle, KeepAliveReceiver, KeepAliveShared,
};

/// Default silence timeout before a keep-alive trigger
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default peak sensitivity (-60 dBFS ≈ 0.001 linear)
pub const DEFAULT_SENSITIVITY_DBFS: f64 = -60.0;

/// Convert a dBFS peak level to a linear amplitude in [0, 1]
///
/// `-inf` (and NaN) map to 0.0, which selects any-non-zero detection.
pub fn dbfs_to_amplitude(dbfs: f64) -> f32 {
    if dbfs.is_nan() {
        return 0.0;
    }
    let amplitude = 10.0_f64.powf(dbfs / 20.0);
    if amplitude <= 0.0 {
        0.0
    } else {
        amplitude.min(1.0) as f32
    }
}

/// Silence detector with a repeating one-shot trigger
///
/// Callers are serialized externally (one thread feeds input at a time),
/// so the monitor itself takes `&mut self` and holds no locks. Triggers are
/// pushed onto a bounded queue and never block the feeding thread.
pub struct KeepAliveMonitor<C: Clock = SystemClock> {
    clock: C,
    /// Silence required before a trigger
    timeout: Duration,
    /// Start of the current silence period
    silence_start: Instant,
    /// Trigger already raised for the current period
    triggered: bool,
    /// Diagnostic: final frame of the last batch had a non-zero sample
    last_frame_had_sound: bool,
    shared: Arc<KeepAliveShared>,
    trigger_tx: rtrb::Producer<KeepAliveEvent>,
}

impl KeepAliveMonitor<SystemClock> {
    /// Create a wall-clock monitor with the default -60 dBFS sensitivity
    pub fn new(timeout: Duration) -> (Self, KeepAliveReceiver) {
        Self::with_clock(SystemClock, timeout)
    }
}

impl<C: Clock> KeepAliveMonitor<C> {
    /// Create a monitor driven by `clock`
    pub fn with_clock(clock: C, timeout: Duration) -> (Self, KeepAliveReceiver) {
        let (trigger_tx, receiver) = keep_alive_channel();
        let silence_start = clock.now();
        let monitor = Self {
            clock,
            timeout,
            silence_start,
            triggered: false,
            last_frame_had_sound: false,
            shared: Arc::new(KeepAliveShared::new(dbfs_to_amplitude(
                DEFAULT_SENSITIVITY_DBFS,
            ))),
            trigger_tx,
        };
        (monitor, receiver)
    }

    /// Handle for controlling this monitor from another thread
    pub fn handle(&self) -> KeepAliveHandle {
        KeepAliveHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Scan one batch of interleaved input
    ///
    /// Sound anywhere in the batch restarts the silence timer. Otherwise,
    /// once the silence reaches the timeout, one trigger is emitted and the
    /// timer restarts for the next period.
    pub fn process_input_samples(
        &mut self,
        samples: &[f32],
        frame_count: usize,
        channel_count: usize,
    ) {
        if frame_count == 0 || channel_count == 0 {
            return;
        }

        if self.shared.take_reset_request() {
            self.reset_silence_timer();
        }

        let batch = &samples[..(frame_count * channel_count).min(samples.len())];

        let threshold = self.shared.threshold();
        let batch_has_sound = if threshold <= 0.0 {
            batch.iter().any(|&s| s != 0.0)
        } else {
            batch.iter().any(|s| s.abs() >= threshold)
        };

        let last_start = (frame_count - 1) * channel_count;
        self.last_frame_had_sound = batch
            .get(last_start..)
            .map(|frame| frame.iter().take(channel_count).any(|&s| s != 0.0))
            .unwrap_or(false);

        let now = self.clock.now();
        if batch_has_sound {
            self.restart_period(now);
        } else {
            let elapsed = now.saturating_duration_since(self.silence_start);
            if elapsed >= self.timeout && !self.triggered {
                self.triggered = true;
                self.emit(elapsed);
                // Next cycle starts right away so keep-alive repeats
                self.restart_period(now);
            }
        }

        self.shared.publish(
            self.last_frame_had_sound,
            now.saturating_duration_since(self.silence_start),
        );
    }

    fn emit(&mut self, silence: Duration) {
        let event = KeepAliveEvent {
            sequence: self.shared.next_trigger_sequence(),
            silence,
        };
        if self.trigger_tx.push(event).is_err() {
            self.shared.count_dropped_trigger();
        }
    }

    #[inline]
    fn restart_period(&mut self, now: Instant) {
        self.silence_start = now;
        self.triggered = false;
    }

    /// Restart the silence timer
    pub fn reset_silence_timer(&mut self) {
        let now = self.clock.now();
        self.restart_period(now);
    }

    /// Seconds since the last reset
    pub fn silence_duration_seconds(&self) -> f64 {
        self.clock
            .now()
            .saturating_duration_since(self.silence_start)
            .as_secs_f64()
    }

    /// Set the peak threshold from dBFS; `-inf` selects any-non-zero mode
    pub fn set_sensitivity_dbfs(&mut self, dbfs: f64) {
        self.shared.set_threshold(dbfs_to_amplitude(dbfs));
    }

    /// Any non-zero sample counts as sound
    pub fn disable_sensitivity(&mut self) {
        self.shared.set_threshold(0.0);
    }

    pub fn sensitivity_enabled(&self) -> bool {
        self.shared.threshold() > 0.0
    }

    /// Configured sensitivity in dBFS, `-inf` when disabled
    pub fn sensitivity_dbfs(&self) -> f64 {
        self.handle().sensitivity_dbfs()
    }

    /// Linear peak threshold, 0.0 when disabled
    pub fn threshold_amplitude(&self) -> f32 {
        self.shared.threshold()
    }

    pub fn last_frame_had_sound(&self) -> bool {
        self.last_frame_had_sound
    }
}
