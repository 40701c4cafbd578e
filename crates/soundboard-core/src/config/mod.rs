//! Soundboard configuration
//!
//! An explicit [`SoundboardConfig`] is loaded once and passed to
//! [`start_audio_system`](crate::audio::start_audio_system); nothing in the
//! core reads global preferences.
//!
//! - Generic YAML config loading/saving
//! - Standard file locations under the user config directory
//!
//! # Usage
//!
//! ```ignore
//! use soundboard_core::config::{default_config_path, load_config, save_config, SoundboardConfig};
//!
//! let path = default_config_path();
//! let config: SoundboardConfig = load_config(&path);
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod soundboard;

pub use io::{load_config, save_config};
pub use paths::{config_dir, default_config_path, default_connections_path};
pub use soundboard::{KeepAliveConfig, SoundboardConfig, DEFAULT_CLIENT_NAME};
