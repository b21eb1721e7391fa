// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::content::sections::DEFAULT_SECTION_MARKERS;

/// Gain applied to background music when a narration block does not set one
pub const DEFAULT_MUSIC_VOLUME: f32 = 0.15;

/// A named background track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicTrack {
    pub id: String,
    pub label: String,
    pub url: String,
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub default_music_volume: f32, // 0.0-1.0
    pub output_buffer_ms: u32,     // 50-1000ms
    pub tracks: Vec<MusicTrack>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            default_music_volume: DEFAULT_MUSIC_VOLUME,
            output_buffer_ms: 250,
            tracks: vec![],
        }
    }
}

impl PlaybackSettings {
    /// Resolve a block's track reference: absolute URLs pass through, anything else is a catalog id
    pub fn resolve_track(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Some(reference.to_string());
        }
        self.tracks
            .iter()
            .find(|t| t.id == reference)
            .map(|t| t.url.clone())
    }

    pub fn music_volume(&self, requested: Option<f32>) -> f32 {
        requested
            .unwrap_or(self.default_music_volume)
            .clamp(0.0, 1.0)
    }
}

/// Course settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSettings {
    pub section_markers: Vec<String>,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            section_markers: DEFAULT_SECTION_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub playback: PlaybackSettings,
    pub course: CourseSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            playback: PlaybackSettings::default(),
            course: CourseSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings {:?}", path))?;

        info!(path = ?path, "Loaded settings");
        Ok(settings)
    }

    /// Load settings, writing the defaults out on first run so there is a file to edit
    pub fn load_or_create(app_dir: &Path) -> Result<Self> {
        if Self::get_settings_path(app_dir).exists() {
            return Self::load(app_dir);
        }
        let settings = Self::default();
        settings.save(app_dir)?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        // Ensure directory exists
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        info!(path = ?path, "Saved settings");
        Ok(())
    }
}
