// Application state management
use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::player::Player;
use crate::content::sections::SectionSplitter;
use crate::db::connection::DatabaseConnection;
use crate::settings::AppSettings;

pub struct AppState {
    pub player: Arc<Player>,
    pub db: DatabaseConnection,
    pub settings: AppSettings,
    pub splitter: Arc<SectionSplitter>,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(
        player: Player,
        db: DatabaseConnection,
        settings: AppSettings,
        splitter: SectionSplitter,
        app_dir: PathBuf,
    ) -> Self {
        Self {
            player: Arc::new(player),
            db,
            settings,
            splitter: Arc::new(splitter),
            app_dir,
        }
    }
}
