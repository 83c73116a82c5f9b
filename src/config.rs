//! Persisted settings, stored as a small TOML file.
//!
//! Config lives in the OS-standard config directory:
//! - Windows: `%APPDATA%\waveterm\config.toml`
//! - macOS: `~/Library/Application Support/waveterm/config.toml`
//! - Linux: `~/.config/waveterm/config.toml`
//!
//! Only settings that outlive a process are stored here: the engine's
//! live state (playlist, playback position, focus) is never persisted —
//! this file covers only user preferences read at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
}

/// Audio/playback preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Selected output device name (empty = system default).
    pub output_device: String,

    /// Initial volume, in `[0.0, MAX_VOLUME]`.
    pub volume: f32,

    /// Default repeat mode at startup: "none", "track", "playlist".
    pub default_repeat_mode: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_device: String::new(),
            volume: 1.0,
            default_repeat_mode: "none".to_string(),
        }
    }
}

/// Directory holding the config file.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("waveterm"))
}

/// Full path to the config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk.
///
/// Returns default config if the file doesn't exist or can't be
/// parsed; this never fails the caller, matching the error taxonomy's
/// policy that config problems are not fatal.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("no config file at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("failed to parse config file {:?}: {}", path, e);
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk, creating the directory if needed.
///
/// Writes to a temp file and renames over the target so a crash
/// mid-write never leaves a truncated config file behind.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    std::fs::create_dir_all(&dir).map_err(ConfigError::CreateDir)?;

    let path = dir.join("config.toml");
    let contents = toml::to_string_pretty(config)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(ConfigError::Write)?;
    std::fs::rename(&temp_path, &path).map_err(ConfigError::Rename)?;

    tracing::info!("saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[audio]"));
    }

    #[test]
    fn config_roundtrip() {
        let mut config = Config::default();
        config.audio.volume = 0.75;
        config.audio.output_device = "Speakers".to_string();

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.audio.volume, 0.75);
        assert_eq!(parsed.audio.output_device, "Speakers");
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml = r#"
[audio]
volume = 0.5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.audio.volume, 0.5);
        assert_eq!(config.audio.default_repeat_mode, "none");
    }
}
