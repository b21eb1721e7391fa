// Amour - narration playback and course progression
// Module declarations
pub mod audio;
pub mod commands;
pub mod content;
pub mod course;
pub mod db;
pub mod library;
pub mod settings;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use audio::cache::{HttpTrackSource, TrackCache};
use audio::player::Player;
use content::sections::SectionSplitter;
use db::connection::DatabaseConnection;
use settings::AppSettings;
use state::AppState;

/// Build the application state rooted at `app_dir`
pub fn init(app_dir: PathBuf) -> Result<AppState> {
    let settings = AppSettings::load_or_create(&app_dir)?;

    // Initialize database
    let db_path = app_dir.join("amour.db");
    let db = DatabaseConnection::new(db_path).context("Failed to initialize database")?;

    let splitter = SectionSplitter::new(&settings.course.section_markers)
        .context("Invalid section markers in settings")?;

    // One track cache for the whole process, shared by every playback session
    let cache = Arc::new(TrackCache::new());
    let source = Arc::new(HttpTrackSource::new()?);
    let player = Player::new(cache, source, settings.playback.output_buffer_ms);

    info!(app_dir = ?app_dir, "Application state initialized");
    Ok(AppState::new(player, db, settings, splitter, app_dir))
}
