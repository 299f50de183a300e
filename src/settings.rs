//! Game settings
//!
//! Read from a JSON file named by `TILEQUEST_SETTINGS` (default
//! `tilequest.json`). Balance numbers are not settings; they live in `consts`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use glam::UVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::SessionConfig;

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "TILEQUEST_SETTINGS";
pub const DEFAULT_SETTINGS_FILE: &str = "tilequest.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Session ===
    /// Fixed RNG seed; a time-derived seed is used when absent
    pub seed: Option<u64>,
    pub enemy_count: u32,
    /// Map document to load; the generated map is used when absent or broken
    pub map_path: Option<PathBuf>,
    pub asset_dir: PathBuf,

    // === Timing ===
    /// Largest frame delta integrated in one tick (ms)
    pub max_frame_ms: f32,

    // === AI ===
    /// Extra distance (px) before an enemy gives up chasing or attacking
    pub ai_hysteresis: f32,

    // === Display ===
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Show FPS counter
    pub show_fps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            enemy_count: DEFAULT_ENEMY_COUNT,
            map_path: None,
            asset_dir: PathBuf::from("assets"),

            max_frame_ms: MAX_FRAME_MS,

            ai_hysteresis: AI_HYSTERESIS,

            viewport_width: FALLBACK_FRAME_WIDTH as u32,
            viewport_height: FALLBACK_FRAME_HEIGHT as u32,
            show_fps: false,
        }
    }
}

impl Settings {
    /// Settings file location
    pub fn path() -> PathBuf {
        std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    /// Read a settings file; a missing file is `Ok(None)`
    pub fn read_from(path: &Path) -> Result<Option<Self>, SettingsError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings: Settings = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(settings.sanitized()))
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings, falling back to defaults on any problem
    pub fn load() -> Self {
        let path = Self::path();
        match Self::read_from(&path) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::path();
        self.write_to(&path)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Clamp values that would break the simulation
    pub fn sanitized(mut self) -> Self {
        if !self.max_frame_ms.is_finite() || self.max_frame_ms <= 0.0 {
            self.max_frame_ms = MAX_FRAME_MS;
        }
        if !self.ai_hysteresis.is_finite() || self.ai_hysteresis < 0.0 {
            self.ai_hysteresis = 0.0;
        }
        self.viewport_width = self.viewport_width.max(1);
        self.viewport_height = self.viewport_height.max(1);
        self
    }

    /// Configured seed, or one derived from the clock
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }

    pub fn viewport(&self) -> UVec2 {
        UVec2::new(self.viewport_width, self.viewport_height)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            enemy_count: self.enemy_count,
            map_path: self.map_path.clone(),
            max_frame_ms: self.max_frame_ms,
            ai_hysteresis: self.ai_hysteresis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(Settings::read_from(&path).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            seed: Some(9),
            enemy_count: 3,
            show_fps: true,
            ..Default::default()
        };
        settings.write_to(&path).unwrap();
        assert_eq!(Settings::read_from(&path).unwrap(), Some(settings));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "enemy_count": 8 }"#).unwrap();
        let settings = Settings::read_from(&path).unwrap().unwrap();
        assert_eq!(settings.enemy_count, 8);
        assert_eq!(settings.max_frame_ms, MAX_FRAME_MS);
        assert_eq!(settings.viewport(), UVec2::new(800, 600));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::read_from(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn test_sanitize() {
        let settings = Settings {
            max_frame_ms: -5.0,
            ai_hysteresis: f32::NAN,
            viewport_width: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.max_frame_ms, MAX_FRAME_MS);
        assert_eq!(settings.ai_hysteresis, 0.0);
        assert_eq!(settings.viewport_width, 1);
    }

    #[test]
    fn test_session_config_follows_settings() {
        let settings = Settings {
            enemy_count: 2,
            ai_hysteresis: 0.0,
            ..Default::default()
        };
        let config = settings.session_config();
        assert_eq!(config.enemy_count, 2);
        assert_eq!(config.ai_hysteresis, 0.0);
        assert_eq!(config.map_path, None);
    }
}
