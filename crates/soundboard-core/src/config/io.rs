//! Configuration file I/O
//!
//! YAML loading and saving for any serde configuration type. Loading never
//! fails: a missing or broken file yields the defaults.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load configuration from a YAML file
///
/// Missing file: defaults. Unreadable or unparsable file: a warning and
/// defaults, so a broken config never prevents the soundboard from starting.
///
/// # Example
///
/// ```ignore
/// let config: SoundboardConfig = load_config(&default_config_path());
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("No config at {:?}, using defaults", path);
        return T::default();
    }

    let parsed = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))
        .and_then(|contents| {
            serde_yaml::from_str::<T>(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", path))
        });

    match parsed {
        Ok(config) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("{:#}, using defaults", e);
            T::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::SoundboardConfig;
    use crate::resample::ResampleQuality;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config: SoundboardConfig = load_config(Path::new("/nonexistent/path/config.yaml"));
        assert_eq!(config, SoundboardConfig::default());
    }

    #[test]
    fn test_load_invalid_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "default_gain: [not, a, number]\n").unwrap();

        let config: SoundboardConfig = load_config(&path);
        assert_eq!(config, SoundboardConfig::default());
    }

    #[test]
    fn test_save_creates_directories_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libresoundboard").join("config.yaml");

        let mut config = SoundboardConfig::default();
        config.client_name = "studio_board".to_string();
        config.default_gain = 0.5;
        config.resample_quality = ResampleQuality::Best;
        config.keep_alive.timeout_seconds = 300;

        save_config(&config, &path).unwrap();
        let loaded: SoundboardConfig = load_config(&path);
        assert_eq!(loaded, config);
    }
}
