// Background track cache
// Fetched and decoded tracks keyed by URL, shared across playback sessions

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::decoder::{extension_hint, AudioDecoder};
use super::error::AudioError;
use super::track::DecodedTrack;

/// Where encoded background tracks come from
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AudioError>;
}

/// Fetches tracks over HTTP(S)
pub struct HttpTrackSource {
    client: reqwest::Client,
}

impl HttpTrackSource {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TrackSource for HttpTrackSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AudioError> {
        let fetch_error = |reason: String| AudioError::MusicFetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let bytes = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Append-only URL -> decoded track cache. Failures are never cached.
#[derive(Default)]
pub struct TrackCache {
    tracks: Mutex<HashMap<String, Arc<DecodedTrack>>>,
}

impl TrackCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<DecodedTrack>> {
        self.tracks.lock().get(url).cloned()
    }

    pub fn insert(&self, url: &str, track: DecodedTrack) -> Arc<DecodedTrack> {
        let mut tracks = self.tracks.lock();
        // Keep the first entry if a concurrent load got here first
        tracks
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(track))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.tracks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.lock().is_empty()
    }

    /// Return the cached track for `url`, fetching and decoding it on a miss
    pub async fn get_or_load(
        &self,
        url: &str,
        source: &dyn TrackSource,
    ) -> Result<Arc<DecodedTrack>, AudioError> {
        if let Some(track) = self.get(url) {
            debug!(url, "Background track cache hit");
            return Ok(track);
        }

        let bytes = source.fetch(url).await?;
        let extension = extension_hint(url).map(|e| e.to_string());

        let track = tokio::task::spawn_blocking(move || {
            AudioDecoder::from_bytes(bytes, extension.as_deref())?.decode_to_mono()
        })
        .await
        .map_err(|e| AudioError::MusicDecode(format!("Decode task failed: {}", e)))??;

        info!(
            url,
            sample_rate = track.sample_rate,
            duration_ms = track.duration_ms(),
            "Decoded background track"
        );
        Ok(self.insert(url, track))
    }
}
