// Audio playback module
// Uses Symphonia for decoding background tracks and cpal for output

pub mod cache;
pub mod decoder;
pub mod error;
pub mod mixer;
pub mod output;
pub mod pcm;
pub mod player;
pub mod track;

pub use cache::{HttpTrackSource, TrackCache, TrackSource};
pub use error::AudioError;
pub use pcm::{decode_narration, encode_narration, resample, NARRATION_SAMPLE_RATE};
pub use player::{MusicRequest, PlaybackEnd, PlaybackHandle, PlaybackState, Player};
