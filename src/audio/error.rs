// Audio error taxonomy
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    /// Narration bytes could not be decoded. Fatal.
    #[error("Could not decode narration: {0}")]
    InvalidNarration(String),

    /// No usable output device or stream. Fatal.
    #[error("Audio output unavailable: {0}")]
    Output(String),

    /// The playback session failed to start. Fatal.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Background track could not be fetched. Degrades to narration only.
    #[error("Failed to fetch background track {url}: {reason}")]
    MusicFetch { url: String, reason: String },

    /// Background track could not be decoded. Degrades to narration only.
    #[error("Failed to decode background track: {0}")]
    MusicDecode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),

    /// `stop()` arrived before the session started
    #[error("Playback stopped before it started")]
    Cancelled,
}

impl AudioError {
    /// Whether this error stops playback rather than degrading it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AudioError::InvalidNarration(_) | AudioError::Output(_) | AudioError::Playback(_)
        )
    }

    /// Retry-oriented message for the person who pressed play
    pub fn user_message(&self) -> String {
        match self {
            AudioError::InvalidNarration(_) => {
                "This narration could not be read. Please regenerate the audio and try again.".to_string()
            }
            AudioError::Output(_) | AudioError::Playback(_) => {
                "Audio playback failed. Check your output device and try again.".to_string()
            }
            AudioError::Cancelled => "Playback stopped.".to_string(),
            other => other.to_string(),
        }
    }
}
