use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::config::Config;
use crate::error::Error;
use crate::events::{BackendEvent, DestroyReason, Notification};
use crate::model::filter::{FilterPreset, Filters};
use crate::model::gateway::event::TrackEndReason;
use crate::model::id::{ChannelId, GuildId};
use crate::model::search::{is_link, LoadResult, SearchSource};
use crate::model::track::Track;
use crate::session::{transition, LoopMode, Outcome, PlayResult, PlaybackSession, SeekOutcome, SkipOutcome};
use crate::settings::{GuildSettings, SettingsStore};
use crate::snapshot::{Panel, PanelView, QueueSnapshot, SessionSnapshot};
use crate::stream::NotificationStream;
use crate::Result;

/// Shared handle to a guild's session. Every read and write goes through the
/// mutex, which serializes commands and backend events for the guild.
pub type SessionRef = Arc<Mutex<PlaybackSession>>;

/// Voice close codes after which the bot is no longer in the channel.
const FORCED_CLOSE_CODES: [u16; 2] = [4006, 4014];

const NOTIFICATION_BUFFER: usize = 256;

pub(crate) struct Shared {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub settings: Arc<dyn SettingsStore>,
    pub sessions: DashMap<GuildId, SessionRef>,
    /// Per-guild creation locks, so concurrent first plays share one connect.
    pub creating: DashMap<GuildId, Arc<Mutex<()>>>,
    pub notify: mpsc::Sender<Notification>,
    pub notifications: parking_lot::Mutex<Option<mpsc::Receiver<Notification>>>
}

/// Owns every guild's playback session.
#[derive(Clone)]
pub struct MusicManager {
    pub(crate) shared: Arc<Shared>
}

impl MusicManager {
    pub fn new(config: Config, backend: Arc<dyn Backend>, settings: Arc<dyn SettingsStore>) -> Self {
        let (notify, notifications) = mpsc::channel(NOTIFICATION_BUFFER);

        Self {
            shared: Arc::new(Shared {
                config,
                backend,
                settings,
                sessions: DashMap::new(),
                creating: DashMap::new(),
                notify,
                notifications: parking_lot::Mutex::new(Some(notifications))
            })
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Stream of notifications for the presentation layer. Only one stream
    /// can be active at a time.
    pub fn notifications(&self) -> Option<NotificationStream<'_>> {
        NotificationStream::new(&self.shared.notifications)
    }

    /// Spawns a task feeding backend events into the sessions.
    pub fn listen(&self, mut events: mpsc::UnboundedReceiver<BackendEvent>) -> JoinHandle<()> {
        let this = self.clone();

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                this.handle_event(event).await;
            }
            debug!("Backend event channel closed");
        })
    }

    /// Pure lookup of the guild's session.
    pub fn session(&self, guild: GuildId) -> Option<SessionRef> {
        self.shared.sessions.get(&guild).map(|s| Arc::clone(s.value()))
    }

    pub fn session_count(&self) -> usize {
        self.shared.sessions.len()
    }

    /// Returns the guild's session, creating and connecting one if needed.
    /// An existing session only has its notification channel updated.
    pub async fn get_or_create_session(
        &self,
        guild: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId
    ) -> Result<SessionRef> {
        loop {
            if let Some(handle) = self.session(guild) {
                let mut session = Arc::clone(&handle).lock_owned().await;

                if !session.destroyed {
                    session.text_channel = text_channel;
                    return Ok(handle);
                }

                // Torn down while we waited, the registry no longer has it.
                continue;
            }

            let lock = self.shared.creating.entry(guild).or_default().clone();
            let _creating = lock.lock().await;

            // The previous creator already finished and released the entry.
            let current = self.shared.creating.get(&guild).map(|l| Arc::ptr_eq(l.value(), &lock));
            if current != Some(true) || self.session(guild).is_some() {
                continue;
            }

            let created = self.create_session(guild, voice_channel, text_channel).await;
            if let Ok(handle) = &created {
                self.shared.sessions.insert(guild, Arc::clone(handle));
            }
            self.shared.creating.remove(&guild);

            return created;
        }
    }

    async fn create_session(
        &self,
        guild: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId
    ) -> Result<SessionRef> {
        let saved = self.shared.settings.load(guild).unwrap_or_else(|e| {
            warn!(%guild, "Could not load guild settings, using defaults: {e}");
            GuildSettings::default()
        });

        let volume = saved.volume.map(|v| v.min(100)).unwrap_or(self.shared.config.default_volume);
        let loop_mode = saved.loop_mode.unwrap_or_default();

        self.call(self.shared.backend.connect(guild, voice_channel)).await?;

        if let Err(e) = self.call(self.shared.backend.set_volume(guild, volume)).await {
            warn!(%guild, "Could not apply saved volume: {e}");
        }

        debug!(%guild, %voice_channel, volume, %loop_mode, "Session created");

        Ok(Arc::new(Mutex::new(PlaybackSession::new(
            guild,
            voice_channel,
            text_channel,
            volume,
            loop_mode,
            self.shared.config.history_depth
        ))))
    }

    /// Destroys the guild's session. Returns whether there was one.
    pub async fn destroy_session(&self, guild: GuildId) -> bool {
        let Some(handle) = self.session(guild) else {
            return false;
        };

        let session = handle.lock_owned().await;
        if session.destroyed {
            return false;
        }

        self.destroy_locked(session, DestroyReason::Stopped).await;
        true
    }

    async fn destroy_locked(&self, mut session: OwnedMutexGuard<PlaybackSession>, reason: DestroyReason) {
        let guild = session.guild();

        session.destroyed = true;
        session.idle.cancel();
        session.queue.clear();

        if let Err(e) = self.call(self.shared.backend.disconnect(guild)).await {
            warn!(%guild, "Failed to disconnect from voice: {e}");
        }

        // A live session is always the registered one. It is removed before
        // the lock is released, so anyone who waited on it finds the registry
        // already clear.
        self.shared.sessions.remove(&guild);

        let text_channel = session.text_channel;
        drop(session);

        debug!(%guild, ?reason, "Session destroyed");
        self.notify(Notification::SessionDestroyed { guild, text_channel, reason });
    }

    /// Locks a live session.
    async fn lock(&self, guild: GuildId) -> Result<OwnedMutexGuard<PlaybackSession>> {
        let handle = self.session(guild).ok_or(Error::NoSession(guild))?;
        let session = handle.lock_owned().await;

        if session.destroyed {
            return Err(Error::NoSession(guild));
        }

        Ok(session)
    }

    /// Bounds a backend call by the request timeout.
    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match timeout(self.shared.config.request_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::BackendUnavailable("backend call timed out".to_string()))
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(e) = self.shared.notify.try_send(notification) {
            debug!("Dropped notification: {e}");
        }
    }

    fn persist(&self, guild: GuildId, update: GuildSettings) {
        if let Err(e) = self.shared.settings.update(guild, update) {
            warn!(%guild, "Could not save guild settings: {e}");
        }
    }

    /// Schedules the idle teardown, replacing any pending one.
    fn arm_idle(&self, session: &mut PlaybackSession) {
        let shared = Arc::downgrade(&self.shared);
        let guild = session.guild();
        let instance = session.instance;
        let delay = self.shared.config.idle_timeout;

        session.idle.arm(move |generation| {
            tokio::spawn(idle_expiry(shared, guild, instance, generation, delay))
        });
        debug!(%guild, ?delay, generation = session.idle.generation(), "Idle timer started");
    }

    async fn expire_idle(&self, guild: GuildId, instance: Uuid, generation: u64) {
        let Some(handle) = self.session(guild) else { return };
        let mut session = handle.lock_owned().await;

        if session.destroyed || session.instance != instance || !session.idle.fire(generation) {
            return;
        }

        if session.current().is_some() {
            return;
        }

        debug!(%guild, "Idle timeout reached");
        self.destroy_locked(session, DestroyReason::Idle).await;
    }

    /// Sends `track` to the backend and commits `queue`. With no track the
    /// backend is stopped instead and the idle timer starts.
    async fn commit(
        &self,
        session: &mut PlaybackSession,
        queue: crate::queue::Queue,
        track: Option<&Track>
    ) -> Result<()> {
        let guild = session.guild();

        match track {
            Some(track) => {
                session.reset_started();
                self.call(self.shared.backend.play(guild, track, Duration::ZERO, false)).await?;
                session.paused = false;
                session.set_position(Duration::ZERO);
                session.idle.cancel();
            },
            None => {
                self.call(self.shared.backend.stop(guild)).await?;
            }
        }

        session.queue = queue;

        if session.current().is_none() {
            self.arm_idle(session);
        }

        Ok(())
    }

    /// Starts the idle timer of a session left with nothing playing, unless
    /// one is already pending.
    async fn idle_if_stopped(&self, handle: &SessionRef) {
        let mut session = handle.lock().await;

        if !session.destroyed && session.current().is_none() && !session.idle.is_armed() {
            self.arm_idle(&mut session);
        }
    }

    /// Searches `query`, retrying non-link queries with the alternate source
    /// when nothing was found.
    async fn search(&self, query: &str, source: SearchSource) -> Result<LoadResult> {
        let found = self.call(self.shared.backend.search(query, source)).await?;

        if !found.is_empty() || is_link(query.trim()) {
            return Ok(found);
        }

        match source.alternate() {
            Some(alternate) => {
                debug!(%source, %alternate, "Nothing found, retrying with alternate source");
                self.call(self.shared.backend.search(query, alternate)).await
            },
            None => Ok(found)
        }
    }

    /// Waits until the backend reports `track` as started, bounded by the
    /// configured timeout.
    async fn await_start(&self, mut started: watch::Receiver<Option<String>>, track: &Track) {
        let wait = started.wait_for(|s| s.as_deref() == Some(track.encoded.as_str()));

        if timeout(self.shared.config.track_start_timeout, wait).await.is_err() {
            debug!(track = %track.title(), "Track start not acknowledged in time");
        }
    }

    /// Searches `query` and queues what it found, starting playback when
    /// nothing is streaming. Creates the session on first use.
    pub async fn play(
        &self,
        guild: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        query: &str,
        requester: &str,
        source: Option<SearchSource>
    ) -> Result<PlayResult> {
        let handle = self.get_or_create_session(guild, voice_channel, text_channel).await?;
        let source = source.unwrap_or(self.shared.config.default_source);

        let found = match self.search(query, source).await {
            Ok(found) => found,
            Err(e) => {
                self.idle_if_stopped(&handle).await;
                return Err(e);
            }
        };

        let (tracks, playlist) = match found {
            LoadResult::Track(track) => (vec![track], None),
            LoadResult::Playlist { title, tracks } => (tracks, Some(title)),
            LoadResult::Empty => (Vec::new(), None)
        };

        let mut session = handle.lock_owned().await;
        if session.destroyed {
            return Err(Error::NoSession(guild));
        }

        if tracks.is_empty() {
            if session.current().is_none() && !session.idle.is_armed() {
                self.arm_idle(&mut session);
            }
            return Ok(PlayResult::default());
        }

        let tracks: Vec<Track> = tracks.into_iter().map(|t| t.with_requester(requester)).collect();
        let result = PlayResult {
            added: tracks.len(),
            first: tracks.first().cloned(),
            playlist,
            started: false
        };

        session.queue.extend(tracks);
        session.idle.cancel();

        let mut queue = session.queue.clone();
        let Some(next) = transition::start_if_idle(&mut queue) else {
            return Ok(result);
        };

        if let Err(e) = self.commit(&mut session, queue, Some(&next)).await {
            // The tracks stay queued for the next play.
            self.arm_idle(&mut session);
            return Err(e);
        }

        Ok(PlayResult { started: true, ..result })
    }

    pub async fn pause(&self, guild: GuildId) -> Result<Outcome> {
        self.set_paused(guild, true).await
    }

    pub async fn resume(&self, guild: GuildId) -> Result<Outcome> {
        self.set_paused(guild, false).await
    }

    async fn set_paused(&self, guild: GuildId, paused: bool) -> Result<Outcome> {
        let mut session = self.lock(guild).await?;

        if session.paused == paused {
            return Ok(Outcome::Unchanged);
        }

        self.call(self.shared.backend.set_paused(guild, paused)).await?;
        session.pin_position();
        session.paused = paused;

        Ok(Outcome::Applied)
    }

    /// Moves to the next queued track right away.
    pub async fn skip(&self, guild: GuildId) -> Result<SkipOutcome> {
        let mut session = self.lock(guild).await?;

        if session.queue.is_idle() {
            return Ok(SkipOutcome::NothingPlaying);
        }

        let mut queue = session.queue.clone();
        let next = transition::skip(&mut queue, session.loop_mode);
        self.commit(&mut session, queue, next.as_ref()).await?;

        let Some(next) = next else {
            self.notify(Notification::QueueEnded { guild, text_channel: session.text_channel });
            return Ok(SkipOutcome::QueueEnded);
        };

        let started = session.started();
        drop(session);
        self.await_start(started, &next).await;

        Ok(SkipOutcome::Playing(next))
    }

    /// Replays the most recently played track. `None` when there is none.
    pub async fn previous(&self, guild: GuildId) -> Result<Option<Track>> {
        let mut session = self.lock(guild).await?;

        let mut queue = session.queue.clone();
        let Some(prev) = transition::previous(&mut queue) else {
            return Ok(None);
        };

        self.commit(&mut session, queue, Some(&prev)).await?;

        let started = session.started();
        drop(session);
        self.await_start(started, &prev).await;

        Ok(Some(prev))
    }

    pub async fn seek(&self, guild: GuildId, position: Duration) -> Result<SeekOutcome> {
        let mut session = self.lock(guild).await?;

        let Some(track) = session.current() else {
            return Ok(SeekOutcome::NoTrack);
        };

        if !track.can_seek() {
            return Ok(SeekOutcome::Unseekable);
        }

        let position = position.min(track.duration());
        self.call(self.shared.backend.seek(guild, position)).await?;
        session.set_position(position);

        Ok(SeekOutcome::Seeked(position))
    }

    /// Clears the queue and destroys the session.
    pub async fn stop(&self, guild: GuildId) -> Result<()> {
        let session = self.lock(guild).await?;
        self.destroy_locked(session, DestroyReason::Stopped).await;
        Ok(())
    }

    pub async fn volume(&self, guild: GuildId) -> Result<u8> {
        Ok(self.lock(guild).await?.volume)
    }

    /// Sets the volume, clamped to `0..=100`, and returns the applied value.
    pub async fn set_volume(&self, guild: GuildId, level: i64) -> Result<u8> {
        let mut session = self.lock(guild).await?;
        self.apply_volume(&mut session, level).await
    }

    /// Moves the volume by `delta` from its current value, read and written
    /// under one lock.
    pub async fn step_volume(&self, guild: GuildId, delta: i64) -> Result<u8> {
        let mut session = self.lock(guild).await?;
        let level = i64::from(session.volume) + delta;
        self.apply_volume(&mut session, level).await
    }

    async fn apply_volume(&self, session: &mut PlaybackSession, level: i64) -> Result<u8> {
        let guild = session.guild();
        let volume = level.clamp(0, 100) as u8;

        self.call(self.shared.backend.set_volume(guild, volume)).await?;
        session.volume = volume;
        self.persist(guild, GuildSettings { volume: Some(volume), loop_mode: None });

        Ok(volume)
    }

    pub async fn loop_mode(&self, guild: GuildId) -> Result<LoopMode> {
        Ok(self.lock(guild).await?.loop_mode)
    }

    /// Sets the loop mode from user input. Anything but `off`, `track` or
    /// `queue` leaves the mode as is and returns it.
    pub async fn set_loop_mode(&self, guild: GuildId, mode: &str) -> Result<LoopMode> {
        match mode.parse::<LoopMode>() {
            Ok(mode) => self.set_loop(guild, mode).await,
            Err(e) => {
                debug!(%guild, "Ignoring loop mode: {e}");
                self.loop_mode(guild).await
            }
        }
    }

    pub async fn set_loop(&self, guild: GuildId, mode: LoopMode) -> Result<LoopMode> {
        let mut session = self.lock(guild).await?;

        session.loop_mode = mode;
        self.persist(guild, GuildSettings { volume: None, loop_mode: Some(mode) });

        Ok(mode)
    }

    /// Applies a preset by name and returns the labels of the filters now
    /// active.
    pub async fn apply_filter(&self, guild: GuildId, preset: &str) -> Result<Vec<String>> {
        let preset = preset.parse::<FilterPreset>().map_err(Error::UnknownFilter)?;
        self.apply_preset(guild, preset).await
    }

    pub async fn apply_preset(&self, guild: GuildId, preset: FilterPreset) -> Result<Vec<String>> {
        let mut session = self.lock(guild).await?;

        let mut filters = session.filters.clone();
        filters.apply(preset);

        self.call(self.shared.backend.set_filters(guild, &filters)).await?;
        session.filters = filters;

        Ok(session.filters.enabled_labels())
    }

    /// Replaces the whole filter set with a custom one.
    pub async fn set_filters(&self, guild: GuildId, filters: Filters) -> Result<Vec<String>> {
        let mut session = self.lock(guild).await?;

        self.call(self.shared.backend.set_filters(guild, &filters)).await?;
        session.filters = filters;

        Ok(session.filters.enabled_labels())
    }

    pub async fn enabled_filters(&self, guild: GuildId) -> Result<Vec<String>> {
        Ok(self.lock(guild).await?.filters.enabled_labels())
    }

    pub async fn snapshot(&self, guild: GuildId) -> Option<SessionSnapshot> {
        self.lock(guild).await.ok().map(|s| SessionSnapshot::of(&s))
    }

    pub async fn queue(&self, guild: GuildId) -> Option<QueueSnapshot> {
        self.snapshot(guild).await.map(|s| s.queue_view())
    }

    pub async fn panel(&self, guild: GuildId, view: PanelView) -> Panel {
        Panel::project(self.snapshot(guild).await, view)
    }

    /// Applies one backend event.
    pub async fn handle_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::NodeConnected { node, resumed } => {
                info!(%node, resumed, "Node connected");
                self.notify(Notification::NodeConnected { node });
            },
            BackendEvent::NodeDisconnected { node } => {
                warn!(%node, "Node disconnected");
                self.notify(Notification::NodeDisconnected { node: node.clone() });
                self.recover(&node).await;
            },
            BackendEvent::NodeError { node, message } => {
                warn!(%node, "Node error: {message}");
                self.notify(Notification::NodeError { node, message });
            },
            event => {
                let Some(guild) = event.guild() else { return };
                let Some(handle) = self.session(guild) else {
                    debug!(%guild, "Event for a guild without session");
                    return;
                };

                let session = handle.lock_owned().await;
                if !session.destroyed {
                    self.apply_event(session, event).await;
                }
            }
        }
    }

    async fn apply_event(&self, mut session: OwnedMutexGuard<PlaybackSession>, event: BackendEvent) {
        let guild = session.guild();
        let text_channel = session.text_channel;

        match event {
            BackendEvent::TrackStart { track, .. } => {
                if session.acknowledge_start(&track) {
                    self.notify(Notification::TrackStarted { guild, text_channel, track });
                }
            },
            BackendEvent::TrackEnd { track, reason, .. } => {
                if reason.may_start_next() && is_current(&session, &track) {
                    self.advance(&mut session, reason).await;
                }
            },
            BackendEvent::TrackException { track, message, .. } => {
                warn!(%guild, track = %track.title(), "Track errored: {message}");
                self.notify(Notification::TrackErrored { guild, text_channel, track, message });
            },
            BackendEvent::TrackStuck { track, threshold, .. } => {
                warn!(%guild, track = %track.title(), ?threshold, "Track stuck, skipping");
                if is_current(&session, &track) {
                    self.advance(&mut session, TrackEndReason::LoadFailed).await;
                }
            },
            BackendEvent::PlayerUpdate { position, connected, .. } => {
                if !connected {
                    debug!(%guild, "Node reports voice not connected");
                }
                session.set_position(position);
            },
            BackendEvent::VoiceClosed { code, by_remote, .. } => {
                if code.map_or(true, |c| FORCED_CLOSE_CODES.contains(&c)) {
                    info!(%guild, ?code, "Removed from voice channel");
                    self.destroy_locked(session, DestroyReason::Disconnected).await;
                } else {
                    warn!(%guild, ?code, by_remote, "Voice connection closed");
                }
            },
            _ => {}
        }
    }

    /// Moves on after the current track ended by itself.
    async fn advance(&self, session: &mut PlaybackSession, reason: TrackEndReason) {
        let guild = session.guild();
        let mut queue = session.queue.clone();
        let next = transition::track_ended(&mut queue, session.loop_mode, reason);

        match next {
            Some(track) => {
                if let Err(e) = self.commit(session, queue.clone(), Some(&track)).await {
                    warn!(%guild, track = %track.title(), "Could not start next track: {e}");
                    // Leave it queued, the next play starts it.
                    queue.replace_current(None);
                    queue.push_front(track);
                    session.queue = queue;
                    self.arm_idle(session);
                }
            },
            None => {
                session.queue = queue;
                self.arm_idle(session);
                self.notify(Notification::QueueEnded { guild, text_channel: session.text_channel });
            }
        }
    }

    /// Restarts the current track of every session the lost node served.
    async fn recover(&self, node: &str) {
        let handles: Vec<_> = self.shared.sessions
            .iter()
            .filter(|e| self.shared.backend.bound_node(*e.key()).as_deref() == Some(node))
            .map(|e| Arc::clone(e.value()))
            .collect();

        for handle in handles {
            let mut session = handle.lock_owned().await;
            let Some(track) = session.current().cloned().filter(|_| !session.destroyed) else {
                continue;
            };

            let guild = session.guild();
            let position = session.position();
            let paused = session.paused;

            match self.call(self.shared.backend.play(guild, &track, position, paused)).await {
                Ok(()) => {
                    session.set_position(position);
                    debug!(%guild, %node, "Resumed playback after node loss");
                },
                Err(e) => warn!(%guild, %node, "Could not resume playback after node loss: {e}")
            }
        }
    }
}

fn is_current(session: &PlaybackSession, track: &Track) -> bool {
    session.current().map(|c| c.encoded == track.encoded).unwrap_or(false)
}

async fn idle_expiry(shared: Weak<Shared>, guild: GuildId, instance: Uuid, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;

    if let Some(shared) = shared.upgrade() {
        MusicManager { shared }.expire_idle(guild, instance, generation).await;
    }
}
