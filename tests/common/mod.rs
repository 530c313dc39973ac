#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use music_coordinator::model::filter::Filters;
use music_coordinator::model::id::{ChannelId, GuildId};
use music_coordinator::model::search::{LoadResult, SearchSource};
use music_coordinator::model::track::{Track, TrackInfo};
use music_coordinator::{Backend, BackendEvent, Config, Error, MemorySettingsStore, MusicManager, Result, SettingsStore};

pub const GUILD: GuildId = GuildId(1);
pub const VOICE: ChannelId = ChannelId(2);
pub const TEXT: ChannelId = ChannelId(3);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(ChannelId),
    Search(String),
    Play(String, Duration, bool),
    Stop,
    Paused(bool),
    Seek(Duration),
    Volume(u8),
    Filters(Filters),
    Disconnect
}

/// Backend double recording every call. Plays are acknowledged with a track
/// start event like a real node would.
pub struct MockBackend {
    calls: Mutex<Vec<(GuildId, Call)>>,
    results: Mutex<HashMap<String, LoadResult>>,
    events: mpsc::UnboundedSender<BackendEvent>,
    pub connect_delay: Duration,
    pub volume_delay: Duration,
    /// Searches answer with an unreachable node.
    pub fail_search: AtomicBool,
    /// Searches never answer.
    pub hang_search: AtomicBool,
    /// Plays answer with an unreachable node.
    pub fail_play: AtomicBool
}

impl MockBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BackendEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        (Self {
            calls: Mutex::new(Vec::new()),
            results: Mutex::new(HashMap::new()),
            events,
            connect_delay: Duration::ZERO,
            volume_delay: Duration::ZERO,
            fail_search: AtomicBool::new(false),
            hang_search: AtomicBool::new(false),
            fail_play: AtomicBool::new(false)
        }, rx)
    }

    /// Answers `identifier` with `result`.
    pub fn respond(&self, identifier: &str, result: LoadResult) {
        self.results.lock().insert(identifier.to_string(), result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|(_, c)| matches(c)).count()
    }

    pub fn emit(&self, event: BackendEvent) {
        let _ = self.events.send(event);
    }

    pub fn fail_plays(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    fn record(&self, guild: GuildId, call: Call) {
        self.calls.lock().push((guild, call));
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn connect(&self, guild: GuildId, channel: ChannelId) -> Result<()> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        self.record(guild, Call::Connect(channel));
        Ok(())
    }

    async fn search(&self, query: &str, source: SearchSource) -> Result<LoadResult> {
        let identifier = source.identifier(query);
        self.record(GuildId(0), Call::Search(identifier.clone()));

        if self.hang_search.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(Error::BackendUnavailable("down".to_string()));
        }

        Ok(self.results.lock().get(&identifier).cloned().unwrap_or(LoadResult::Empty))
    }

    async fn play(&self, guild: GuildId, track: &Track, position: Duration, paused: bool) -> Result<()> {
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(Error::BackendUnavailable("down".to_string()));
        }

        self.record(guild, Call::Play(track.encoded.clone(), position, paused));
        self.emit(BackendEvent::TrackStart { guild, track: track.clone() });
        Ok(())
    }

    async fn stop(&self, guild: GuildId) -> Result<()> {
        self.record(guild, Call::Stop);
        Ok(())
    }

    async fn set_paused(&self, guild: GuildId, paused: bool) -> Result<()> {
        self.record(guild, Call::Paused(paused));
        Ok(())
    }

    async fn seek(&self, guild: GuildId, position: Duration) -> Result<()> {
        self.record(guild, Call::Seek(position));
        Ok(())
    }

    async fn set_volume(&self, guild: GuildId, volume: u8) -> Result<()> {
        if !self.volume_delay.is_zero() {
            tokio::time::sleep(self.volume_delay).await;
        }
        self.record(guild, Call::Volume(volume));
        Ok(())
    }

    async fn set_filters(&self, guild: GuildId, filters: &Filters) -> Result<()> {
        self.record(guild, Call::Filters(filters.clone()));
        Ok(())
    }

    async fn disconnect(&self, guild: GuildId) -> Result<()> {
        self.record(guild, Call::Disconnect);
        Ok(())
    }

    fn bound_node(&self, _guild: GuildId) -> Option<String> {
        Some("main".to_string())
    }
}

/// Backend that is never reachable.
pub struct DeadBackend;

#[async_trait]
impl Backend for DeadBackend {
    async fn connect(&self, _: GuildId, _: ChannelId) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn search(&self, _: &str, _: SearchSource) -> Result<LoadResult> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn play(&self, _: GuildId, _: &Track, _: Duration, _: bool) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn stop(&self, _: GuildId) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn set_paused(&self, _: GuildId, _: bool) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn seek(&self, _: GuildId, _: Duration) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn set_volume(&self, _: GuildId, _: u8) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn set_filters(&self, _: GuildId, _: &Filters) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }

    async fn disconnect(&self, _: GuildId) -> Result<()> {
        Err(Error::BackendUnavailable("down".to_string()))
    }
}

pub fn track(id: &str) -> Track {
    Track {
        encoded: format!("enc-{id}"),
        info: TrackInfo {
            identifier: id.to_string(),
            title: id.to_string(),
            author: "someone".to_string(),
            duration: Duration::from_secs(180),
            is_seekable: true,
            is_stream: false,
            uri: None,
            artwork_url: None,
            source_name: Some("youtube".to_string())
        },
        requester: None
    }
}

pub fn stream(id: &str) -> Track {
    let mut track = track(id);
    track.info.duration = Duration::ZERO;
    track.info.is_stream = true;
    track.info.is_seekable = false;
    track
}

pub fn playlist(ids: &[&str]) -> LoadResult {
    LoadResult::Playlist {
        title: "mix".to_string(),
        tracks: ids.iter().map(|id| track(id)).collect()
    }
}

pub struct Harness {
    pub manager: MusicManager,
    pub backend: Arc<MockBackend>,
    pub settings: Arc<MemorySettingsStore>
}

/// Manager over a mock backend with its event loop running.
pub fn harness() -> Harness {
    harness_with(MockBackend::new())
}

pub fn harness_with((backend, events): (MockBackend, mpsc::UnboundedReceiver<BackendEvent>)) -> Harness {
    let backend = Arc::new(backend);
    let settings = Arc::new(MemorySettingsStore::default());

    let manager = MusicManager::new(
        Config::default(),
        Arc::clone(&backend) as Arc<dyn Backend>,
        Arc::clone(&settings) as Arc<dyn SettingsStore>
    );
    manager.listen(events);

    Harness { manager, backend, settings }
}

impl Harness {
    pub async fn play(&self, query: &str) -> music_coordinator::PlayResult {
        self.manager.play(GUILD, VOICE, TEXT, query, "alice", None).await.unwrap()
    }

    /// Lets the event loop drain what the mock emitted.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub async fn titles(&self) -> (Option<String>, Vec<String>) {
        let snapshot = self.manager.snapshot(GUILD).await.unwrap();
        (
            snapshot.current.map(|t| t.info.title),
            snapshot.queue.into_iter().map(|t| t.info.title).collect()
        )
    }
}
