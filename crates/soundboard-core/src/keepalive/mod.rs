//! Silence detection and keep-alive triggering
//!
//! Watches the input stream (or injected test input) and raises a one-shot
//! trigger once the input has stayed silent for a configurable timeout.
//! After each trigger the timer restarts, so keep-alive repeats for as long
//! as the silence lasts.
//!
//! # State machine
//!
//! ```text
//!            sound detected (timer reset)
//!          ┌──────────────────────────┐
//!          ▼                          │
//! ┌──────────────────────┐  elapsed ≥ timeout  ┌───────────┐
//! │ Silent-accumulating  │────────────────────►│ Triggered │
//! └──────────────────────┘                     └─────┬─────┘
//!          ▲      emit event, restart timer          │
//!          └─────────────────────────────────────────┘
//! ```
//!
//! # Threading
//!
//! [`KeepAliveMonitor`] is owned by whichever thread feeds it input (usually
//! the audio callback). The control plane talks to it through lock-free
//! atomics in [`KeepAliveHandle`] and receives triggers from a bounded
//! SPSC queue via [`KeepAliveReceiver`]. Neither side ever blocks.

mod clock;
mod control;
mod monitor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use control::{KeepAliveEvent, KeepAliveHandle, KeepAliveReceiver};
pub use monitor::{dbfs_to_amplitude, KeepAliveMonitor, DEFAULT_SENSITIVITY_DBFS, DEFAULT_TIMEOUT};
