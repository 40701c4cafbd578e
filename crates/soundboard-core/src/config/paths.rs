//! Standard locations of soundboard files
//!
//! Everything lives in `~/.config/libresoundboard` (or the platform's
//! equivalent user config directory).

use std::path::PathBuf;

const APP_DIR: &str = "libresoundboard";

/// `~/.config/libresoundboard`
///
/// Falls back to the current directory when no config directory is known.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `~/.config/libresoundboard/config.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// `~/.config/libresoundboard/jack_connections.cfg`
pub fn default_connections_path() -> PathBuf {
    config_dir().join("jack_connections.cfg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_app_dir() {
        assert!(config_dir().ends_with(APP_DIR));
        assert!(default_config_path().ends_with("libresoundboard/config.yaml"));
        assert!(default_connections_path().ends_with("libresoundboard/jack_connections.cfg"));
    }
}
