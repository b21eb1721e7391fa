// Settings module

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::{AppSettings, MusicTrack, PlaybackSettings};
