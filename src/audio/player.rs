// Narration player
// One shared engine for every surface that plays narration: decode, resample,
// optional looping music bed, synchronized start and stop

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::cache::{TrackCache, TrackSource};
use super::error::AudioError;
use super::mixer::{Mixer, MusicBed};
use super::output::{device_output, OutputOpener};
use super::pcm::{self, NARRATION_SAMPLE_RATE};
use super::track::DecodedTrack;
use crate::content::models::AudioNarrationBlock;

/// Frames mixed per write to the output buffer
const MIX_CHUNK_FRAMES: usize = 1024;

/// How often a session waiting on its music bed checks for `stop()`
const MUSIC_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing { session: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { session: u64 },
    Stopped { session: u64 },
    NarrationEnded { session: u64 },
}

/// Playback transitions. Events for a session other than the current one are ignored.
pub fn transition(state: PlaybackState, event: PlaybackEvent) -> PlaybackState {
    match (state, event) {
        (_, PlaybackEvent::Started { session }) => PlaybackState::Playing { session },
        (PlaybackState::Playing { session: current }, PlaybackEvent::Stopped { session })
        | (PlaybackState::Playing { session: current }, PlaybackEvent::NarrationEnded { session })
            if current == session =>
        {
            PlaybackState::Idle
        }
        (state, _) => state,
    }
}

/// How a playback session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// Narration played to the end; music stopped with it
    Completed,
    Stopped,
}

/// Background track to loop under the narration
#[derive(Debug, Clone)]
pub struct MusicRequest {
    pub url: String,
    pub volume: f32,
}

/// Returned by `play()` once audio has started
pub struct PlaybackHandle {
    pub session: u64,
    pub sample_rate: u32,
    /// Whether the music bed made it into this session
    pub with_music: bool,
    ended: oneshot::Receiver<PlaybackEnd>,
}

impl PlaybackHandle {
    /// Wait for the session to end
    pub async fn finished(self) -> PlaybackEnd {
        self.ended.await.unwrap_or(PlaybackEnd::Stopped)
    }
}

struct Session {
    id: u64,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// Background track handed to the playback thread once it has been loaded
type MusicBedSource = Option<(Arc<DecodedTrack>, f32)>;

pub struct Player {
    cache: Arc<TrackCache>,
    source: Arc<dyn TrackSource>,
    buffer_ms: u32,
    open_output: OutputOpener,
    state: Arc<Mutex<PlaybackState>>,
    session: Mutex<Option<Session>>,
    next_session: AtomicU64,
}

impl Player {
    pub fn new(cache: Arc<TrackCache>, source: Arc<dyn TrackSource>, buffer_ms: u32) -> Self {
        Self::with_output(cache, source, buffer_ms, device_output())
    }

    /// Player writing to a custom output instead of the default device
    pub fn with_output(
        cache: Arc<TrackCache>,
        source: Arc<dyn TrackSource>,
        buffer_ms: u32,
        open_output: OutputOpener,
    ) -> Self {
        Self {
            cache,
            source,
            buffer_ms,
            open_output,
            state: Arc::new(Mutex::new(PlaybackState::Idle)),
            session: Mutex::new(None),
            next_session: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock()
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state(), PlaybackState::Playing { .. })
    }

    pub fn cache(&self) -> &Arc<TrackCache> {
        &self.cache
    }

    /// Start narration, with an optional music bed.
    ///
    /// The output is opened before the music is fetched, so a missing device is
    /// reported first. A `stop()` that lands while the music is loading cancels
    /// the session: nothing is played and `AudioError::Cancelled` is returned,
    /// though the fetched track still lands in the cache.
    ///
    /// Callers stop any previous session first; the engine does not serialize
    /// overlapping `play()` calls. Music failures are logged and playback
    /// continues narration-only.
    pub async fn play(
        &self,
        narration: &AudioNarrationBlock,
        music: Option<MusicRequest>,
    ) -> Result<PlaybackHandle, AudioError> {
        let samples = pcm::decode_narration(&narration.base64_pcm)?;
        if samples.is_empty() {
            return Err(AudioError::InvalidNarration("narration is empty".to_string()));
        }

        if let Some(previous) = self.take_session(None) {
            warn!(session = previous.id, "Starting playback over an unstopped session");
            self.finish(previous).await;
        }

        let id = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        let (opened_tx, opened_rx) = oneshot::channel();
        let (music_tx, music_rx) = mpsc::sync_channel::<MusicBedSource>(1);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (end_tx, end_rx) = oneshot::channel();

        let worker = SessionWorker {
            id,
            narration: samples,
            buffer_ms: self.buffer_ms,
            open_output: self.open_output.clone(),
            cancel: cancel.clone(),
            state: self.state.clone(),
        };

        let thread = std::thread::Builder::new()
            .name(format!("narration-{}", id))
            .spawn(move || worker.run(opened_tx, music_rx, ready_tx, end_tx))
            .map_err(|e| AudioError::Playback(format!("Failed to spawn playback thread: {}", e)))?;

        // Registered before any await so stop() can reach a session that is still loading
        *self.session.lock() = Some(Session {
            id,
            cancel: cancel.clone(),
            thread: Some(thread),
        });

        match opened_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.abandon(id).await;
                return Err(e);
            }
            Err(_) => return Err(self.exited_early(id, &cancel).await),
        }

        let music = match music {
            Some(request) => self.load_music(&request).await.map(|track| (track, request.volume)),
            None => None,
        };

        if cancel.load(Ordering::SeqCst) {
            debug!(session = id, "Stopped while loading background music");
            return Err(AudioError::Cancelled);
        }

        // A closed channel means the thread already left; ready_rx reports it
        let _ = music_tx.send(music);

        let (sample_rate, with_music) = match ready_rx.await {
            Ok(ready) => ready,
            Err(_) => return Err(self.exited_early(id, &cancel).await),
        };

        info!(
            session = id,
            sample_rate,
            with_music,
            title = narration.meta.audio_title.as_deref().unwrap_or("untitled"),
            "Narration playing"
        );

        Ok(PlaybackHandle {
            session: id,
            sample_rate,
            with_music,
            ended: end_rx,
        })
    }

    async fn load_music(&self, request: &MusicRequest) -> Option<Arc<DecodedTrack>> {
        match self.cache.get_or_load(&request.url, self.source.as_ref()).await {
            Ok(track) => Some(track),
            Err(e) => {
                warn!(url = %request.url, "Background music unavailable, playing narration only: {}", e);
                None
            }
        }
    }

    /// Stop both sources and close the output. A no-op when idle.
    /// Blocks until the playback thread has exited; async callers use `stop_async`.
    pub fn stop(&self) {
        if let Some(mut session) = self.take_session(None) {
            session.cancel.store(true, Ordering::SeqCst);
            if let Some(thread) = session.thread.take() {
                if thread.join().is_err() {
                    warn!(session = session.id, "Playback thread panicked");
                }
            }
            self.mark_stopped(session.id);
        }
    }

    /// `stop()` without blocking the async runtime on the thread join
    pub async fn stop_async(&self) {
        if let Some(session) = self.take_session(None) {
            self.finish(session).await;
        }
    }

    /// Take the registered session, or only session `id` when given
    fn take_session(&self, id: Option<u64>) -> Option<Session> {
        let mut slot = self.session.lock();
        if let (Some(id), Some(session)) = (id, slot.as_ref()) {
            if session.id != id {
                return None;
            }
        }
        slot.take()
    }

    async fn finish(&self, mut session: Session) {
        session.cancel.store(true, Ordering::SeqCst);
        if let Some(thread) = session.thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                _ => warn!(session = session.id, "Playback thread panicked"),
            }
        }
        self.mark_stopped(session.id);
    }

    /// Tear down session `id` after it failed to start
    async fn abandon(&self, id: u64) {
        if let Some(session) = self.take_session(Some(id)) {
            self.finish(session).await;
        }
    }

    async fn exited_early(&self, id: u64, cancel: &AtomicBool) -> AudioError {
        self.abandon(id).await;
        if cancel.load(Ordering::SeqCst) {
            AudioError::Cancelled
        } else {
            AudioError::Playback("Playback thread exited early".to_string())
        }
    }

    fn mark_stopped(&self, id: u64) {
        let mut state = self.state.lock();
        *state = transition(*state, PlaybackEvent::Stopped { session: id });
        debug!(session = id, "Playback stopped");
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything the playback thread owns
struct SessionWorker {
    id: u64,
    narration: Vec<i16>,
    buffer_ms: u32,
    open_output: OutputOpener,
    cancel: Arc<AtomicBool>,
    state: Arc<Mutex<PlaybackState>>,
}

impl SessionWorker {
    fn run(
        self,
        opened: oneshot::Sender<Result<(), AudioError>>,
        music: mpsc::Receiver<MusicBedSource>,
        ready: oneshot::Sender<(u32, bool)>,
        ended: oneshot::Sender<PlaybackEnd>,
    ) {
        // The output lives and dies on this thread
        let output = match (self.open_output)(self.buffer_ms) {
            Ok(output) => output,
            Err(e) => {
                let _ = opened.send(Err(e));
                return;
            }
        };
        if opened.send(Ok(())).is_err() {
            output.close();
            return;
        }

        let Some(music) = self.wait_for_music(&music) else {
            output.close();
            let _ = ended.send(PlaybackEnd::Stopped);
            return;
        };

        let rate = output.sample_rate();
        let channels = output.channels().max(1) as usize;
        let voice = pcm::resample(&self.narration, NARRATION_SAMPLE_RATE, rate);

        let bed = music.and_then(|(track, gain)| match track.resampled_to(rate) {
            Ok(samples) => Some(MusicBed::new(Arc::new(samples), gain)),
            Err(e) => {
                warn!("Background music dropped: {}", e);
                None
            }
        });

        let mut mixer = Mixer::new(voice, bed);
        let with_music = mixer.has_music();

        self.apply(PlaybackEvent::Started { session: self.id });
        let mut completed = ready.send((rate, with_music)).is_ok();

        let mut chunk = vec![0.0f32; MIX_CHUNK_FRAMES * channels];
        let mut scratch = Vec::with_capacity(MIX_CHUNK_FRAMES);

        while completed {
            let frames = mixer.fill_interleaved(&mut chunk, channels, &mut scratch);
            if frames == 0 {
                break;
            }
            completed = output.write_blocking(&chunk[..frames * channels], &self.cancel);
        }

        if completed {
            completed = output.drain(&self.cancel);
        }
        output.close();

        if completed {
            self.apply(PlaybackEvent::NarrationEnded { session: self.id });
            debug!(session = self.id, "Narration ended");
            let _ = ended.send(PlaybackEnd::Completed);
        } else {
            self.apply(PlaybackEvent::Stopped { session: self.id });
            let _ = ended.send(PlaybackEnd::Stopped);
        }
    }

    /// Block until `play()` hands over the music bed. `None` if the session was
    /// stopped or `play()` went away first.
    fn wait_for_music(&self, music: &mpsc::Receiver<MusicBedSource>) -> Option<MusicBedSource> {
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return None;
            }
            match music.recv_timeout(MUSIC_POLL_INTERVAL) {
                Ok(bed) if !self.cancel.load(Ordering::SeqCst) => return Some(bed),
                Ok(_) | Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
    }

    fn apply(&self, event: PlaybackEvent) {
        let mut state = self.state.lock();
        *state = transition(*state, event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::decoder::tests::wav_bytes;
    use crate::audio::output::OutputSink;
    use crate::content::models::AudioMeta;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct NoSource;

    #[async_trait]
    impl TrackSource for NoSource {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, AudioError> {
            Err(AudioError::MusicFetch {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn player() -> Player {
        Player::new(Arc::new(TrackCache::new()), Arc::new(NoSource), 250)
    }

    fn narration(base64_pcm: &str) -> AudioNarrationBlock {
        AudioNarrationBlock {
            id: "a".to_string(),
            base64_pcm: base64_pcm.to_string(),
            meta: AudioMeta::default(),
        }
    }

    #[test]
    fn test_transitions() {
        let playing = transition(PlaybackState::Idle, PlaybackEvent::Started { session: 1 });
        assert_eq!(playing, PlaybackState::Playing { session: 1 });
        assert_eq!(
            transition(playing, PlaybackEvent::NarrationEnded { session: 1 }),
            PlaybackState::Idle
        );
        assert_eq!(
            transition(playing, PlaybackEvent::Stopped { session: 1 }),
            PlaybackState::Idle
        );
        assert_eq!(
            transition(PlaybackState::Idle, PlaybackEvent::Stopped { session: 1 }),
            PlaybackState::Idle
        );
    }

    #[test]
    fn test_stale_session_events_ignored() {
        let playing = PlaybackState::Playing { session: 2 };
        assert_eq!(transition(playing, PlaybackEvent::NarrationEnded { session: 1 }), playing);
        assert_eq!(transition(playing, PlaybackEvent::Stopped { session: 1 }), playing);
        assert_eq!(
            transition(playing, PlaybackEvent::Started { session: 3 }),
            PlaybackState::Playing { session: 3 }
        );
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let player = player();
        player.stop();
        player.stop();
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn test_bad_narration_is_fatal() {
        let player = player();
        let err = player.play(&narration("@@@"), None).await.err().unwrap();
        assert!(matches!(err, AudioError::InvalidNarration(_)));
        assert!(err.is_fatal());
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_empty_narration_is_fatal() {
        let player = player();
        let err = player.play(&narration(""), None).await.err().unwrap();
        assert!(matches!(err, AudioError::InvalidNarration(_)));
    }

    #[tokio::test]
    async fn test_music_failure_degrades() {
        let player = player();
        let request = MusicRequest {
            url: "https://cdn.test/calm.mp3".to_string(),
            volume: 0.15,
        };
        assert!(player.load_music(&request).await.is_none());
        assert!(player.cache().is_empty());
    }

    /// What a session did to its output
    #[derive(Default)]
    pub(crate) struct SinkLog {
        pub(crate) opened: AtomicUsize,
        pub(crate) closed: AtomicBool,
        pub(crate) written: Mutex<Vec<f32>>,
    }

    struct MemorySink {
        log: Arc<SinkLog>,
        write_delay: Duration,
    }

    impl OutputSink for MemorySink {
        fn sample_rate(&self) -> u32 {
            NARRATION_SAMPLE_RATE
        }

        fn channels(&self) -> u16 {
            1
        }

        fn write_blocking(&self, samples: &[f32], cancel: &AtomicBool) -> bool {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            std::thread::sleep(self.write_delay);
            self.log.written.lock().extend_from_slice(samples);
            true
        }

        fn drain(&self, cancel: &AtomicBool) -> bool {
            !cancel.load(Ordering::SeqCst)
        }

        fn close(self: Box<Self>) {
            self.log.closed.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) fn memory_output(log: Arc<SinkLog>, write_delay: Duration) -> OutputOpener {
        Arc::new(move |_| {
            log.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemorySink {
                log: log.clone(),
                write_delay,
            }) as Box<dyn OutputSink>)
        })
    }

    /// Serves one track, optionally holding each fetch until released
    struct TrackServer {
        body: Vec<u8>,
        gated: bool,
        fetches: AtomicUsize,
        fetch_started: Notify,
        release: Notify,
    }

    impl TrackServer {
        fn new(body: Vec<u8>, gated: bool) -> Self {
            Self {
                body,
                gated,
                fetches: AtomicUsize::new(0),
                fetch_started: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl TrackSource for TrackServer {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, AudioError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.gated {
                self.fetch_started.notify_one();
                self.release.notified().await;
            }
            Ok(self.body.clone())
        }
    }

    fn constant_narration(value: i16, len: usize) -> AudioNarrationBlock {
        narration(&pcm::encode_narration(&vec![value; len]))
    }

    fn calm_track(volume: f32) -> MusicRequest {
        MusicRequest {
            url: "https://cdn.test/calm.wav".to_string(),
            volume,
        }
    }

    #[tokio::test]
    async fn test_narration_plays_to_completion() {
        let log = Arc::new(SinkLog::default());
        let player = Player::with_output(
            Arc::new(TrackCache::new()),
            Arc::new(NoSource),
            250,
            memory_output(log.clone(), Duration::ZERO),
        );

        let handle = player.play(&constant_narration(1000, 3000), None).await.unwrap();
        assert_eq!(handle.sample_rate, NARRATION_SAMPLE_RATE);
        assert!(!handle.with_music);
        assert_eq!(handle.finished().await, PlaybackEnd::Completed);

        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(log.closed.load(Ordering::SeqCst));
        let written = log.written.lock();
        assert_eq!(written.len(), 3000);
        assert!(written.iter().all(|&s| s == 1000.0 / 32768.0));
    }

    #[tokio::test]
    async fn test_music_bed_mixed_and_ends_with_narration() {
        let log = Arc::new(SinkLog::default());
        let server = Arc::new(TrackServer::new(
            wav_bytes(&[16384; 100], NARRATION_SAMPLE_RATE, 1),
            false,
        ));
        let player = Player::with_output(
            Arc::new(TrackCache::new()),
            server.clone(),
            250,
            memory_output(log.clone(), Duration::ZERO),
        );

        let handle = player
            .play(&constant_narration(1000, 500), Some(calm_track(0.2)))
            .await
            .unwrap();
        assert!(handle.with_music);
        assert_eq!(handle.finished().await, PlaybackEnd::Completed);

        // Music loops under the narration and stops with it
        let written = log.written.lock();
        assert_eq!(written.len(), 500);
        let expected = 1000.0 / 32768.0 + 0.5 * 0.2;
        assert!(written.iter().all(|s| (s - expected).abs() < 1e-5));
        assert_eq!(player.cache().len(), 1);
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_stop_cancels_live_session() {
        let log = Arc::new(SinkLog::default());
        let player = Player::with_output(
            Arc::new(TrackCache::new()),
            Arc::new(NoSource),
            250,
            memory_output(log.clone(), Duration::from_millis(5)),
        );

        let handle = player
            .play(&constant_narration(1000, NARRATION_SAMPLE_RATE as usize * 2), None)
            .await
            .unwrap();
        assert!(player.is_playing());

        player.stop_async().await;
        assert_eq!(handle.finished().await, PlaybackEnd::Stopped);
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(log.closed.load(Ordering::SeqCst));
        assert!(log.written.lock().len() < NARRATION_SAMPLE_RATE as usize * 2);
    }

    #[tokio::test]
    async fn test_stop_while_music_loads_plays_nothing() {
        let log = Arc::new(SinkLog::default());
        let server = Arc::new(TrackServer::new(
            wav_bytes(&[16384; 100], NARRATION_SAMPLE_RATE, 1),
            true,
        ));
        let player = Arc::new(Player::with_output(
            Arc::new(TrackCache::new()),
            server.clone(),
            250,
            memory_output(log.clone(), Duration::ZERO),
        ));

        let playing = {
            let player = player.clone();
            let block = constant_narration(1000, 500);
            tokio::spawn(async move { player.play(&block, Some(calm_track(0.15))).await.map(|h| h.session) })
        };

        server.fetch_started.notified().await;
        player.stop();
        server.release.notify_one();

        let result = playing.await.unwrap();
        assert!(matches!(result, Err(AudioError::Cancelled)));
        assert!(!result.unwrap_err().is_fatal());
        assert_eq!(player.state(), PlaybackState::Idle);
        assert!(log.written.lock().is_empty());
        assert!(log.closed.load(Ordering::SeqCst));
        // The fetched track is still kept for next time
        assert!(player.cache().get("https://cdn.test/calm.wav").is_some());
    }

    #[tokio::test]
    async fn test_output_failure_reported_before_music_fetch() {
        let server = Arc::new(TrackServer::new(Vec::new(), false));
        let failing: OutputOpener = Arc::new(|_| Err(AudioError::Output("no device".to_string())));
        let player = Player::with_output(Arc::new(TrackCache::new()), server.clone(), 250, failing);

        let err = player
            .play(&constant_narration(1000, 100), Some(calm_track(0.15)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AudioError::Output(_)));
        assert_eq!(server.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(player.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_session_without_listener_returns_to_idle() {
        let log = Arc::new(SinkLog::default());
        let state = Arc::new(Mutex::new(PlaybackState::Idle));
        let worker = SessionWorker {
            id: 7,
            narration: vec![1000; 100],
            buffer_ms: 250,
            open_output: memory_output(log.clone(), Duration::ZERO),
            cancel: Arc::new(AtomicBool::new(false)),
            state: state.clone(),
        };

        let (opened_tx, _opened_rx) = oneshot::channel();
        let (music_tx, music_rx) = mpsc::sync_channel(1);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (end_tx, mut end_rx) = oneshot::channel();
        music_tx.send(None).unwrap();
        // The caller of play() went away before the session started
        drop(ready_rx);

        worker.run(opened_tx, music_rx, ready_tx, end_tx);

        assert_eq!(*state.lock(), PlaybackState::Idle);
        assert_eq!(end_rx.try_recv().unwrap(), PlaybackEnd::Stopped);
        assert!(log.written.lock().is_empty());
        assert!(log.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_replacing_session_stops_previous() {
        let log = Arc::new(SinkLog::default());
        let player = Player::with_output(
            Arc::new(TrackCache::new()),
            Arc::new(NoSource),
            250,
            memory_output(log.clone(), Duration::from_millis(5)),
        );

        let long = constant_narration(1000, NARRATION_SAMPLE_RATE as usize * 2);
        let first = player.play(&long, None).await.unwrap();
        let second = player.play(&constant_narration(1000, 100), None).await.unwrap();

        assert_eq!(first.finished().await, PlaybackEnd::Stopped);
        assert_eq!(second.finished().await, PlaybackEnd::Completed);
        assert_eq!(log.opened.load(Ordering::SeqCst), 2);
        assert_eq!(player.state(), PlaybackState::Idle);
    }
}
