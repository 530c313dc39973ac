//! Per-guild playback state.
//!
//! A [`PlaybackSession`] only holds state and the pure transitions between
//! states. Backend calls, locking and timers live in the
//! [`MusicManager`](crate::MusicManager), which commits a transition only
//! after the backend accepted it.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use typemap_rev::TypeMap;
use uuid::Uuid;

use crate::idle::IdleTimer;
use crate::model::filter::Filters;
use crate::model::gateway::event::TrackEndReason;
use crate::model::id::{ChannelId, GuildId};
use crate::model::track::Track;
use crate::queue::Queue;

/// What happens to a track once it finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Finished tracks are discarded.
    #[default]
    Off,
    /// The current track repeats.
    Track,
    /// Finished tracks go back to the end of the queue.
    Queue
}

impl LoopMode {
    /// The mode after this one when cycling through them.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Track,
            Self::Track => Self::Queue,
            Self::Queue => Self::Off
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Track => "track",
            Self::Queue => "queue"
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "track" => Ok(Self::Track),
            "queue" => Ok(Self::Queue),
            other => Err(format!("unknown loop mode `{other}`"))
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an operation that may already be in its target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Nothing to do, no backend call was made.
    Unchanged
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipOutcome {
    /// The given track is now playing.
    Playing(Track),
    /// There was nothing left, playback stopped.
    QueueEnded,
    /// Nothing was playing and nothing was queued.
    NothingPlaying
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Seeked to the given, clamped, position.
    Seeked(Duration),
    NoTrack,
    /// The current track is a live stream or not seekable.
    Unseekable
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayResult {
    /// Tracks appended to the queue, zero when the search found nothing.
    pub added: usize,
    /// First matched track.
    pub first: Option<Track>,
    /// Title of the playlist the tracks came from.
    pub playlist: Option<String>,
    /// Whether the call started playback.
    pub started: bool
}

/// One guild's playback session.
pub struct PlaybackSession {
    pub(crate) instance: Uuid,
    guild: GuildId,
    voice_channel: ChannelId,
    pub(crate) text_channel: ChannelId,
    pub(crate) queue: Queue,
    pub(crate) paused: bool,
    pub(crate) volume: u8,
    pub(crate) loop_mode: LoopMode,
    pub(crate) filters: Filters,
    position: Duration,
    position_at: Instant,
    pub(crate) idle: IdleTimer,
    started: watch::Sender<Option<String>>,
    pub(crate) destroyed: bool,
    data: TypeMap
}

impl PlaybackSession {
    pub(crate) fn new(
        guild: GuildId,
        voice_channel: ChannelId,
        text_channel: ChannelId,
        volume: u8,
        loop_mode: LoopMode,
        history_depth: usize
    ) -> Self {
        Self {
            instance: Uuid::new_v4(),
            guild,
            voice_channel,
            text_channel,
            queue: Queue::new(history_depth),
            paused: false,
            volume: volume.min(100),
            loop_mode,
            filters: Filters::default(),
            position: Duration::ZERO,
            position_at: Instant::now(),
            idle: IdleTimer::default(),
            started: watch::channel(None).0,
            destroyed: false,
            data: TypeMap::new()
        }
    }

    pub fn guild(&self) -> GuildId {
        self.guild
    }

    /// Voice channel the bot is in, for "caller shares my channel" checks.
    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    /// Channel notifications for this session are routed to.
    pub fn text_channel(&self) -> ChannelId {
        self.text_channel
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Whether the idle teardown is pending.
    pub fn is_idle_pending(&self) -> bool {
        self.idle.is_armed()
    }

    /// Data attached by the presentation layer, like a panel message reference.
    pub fn data(&self) -> &TypeMap {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut TypeMap {
        &mut self.data
    }

    /// Position in the current track, extrapolated from the last report
    /// while playing and clamped to the track's length.
    pub fn position(&self) -> Duration {
        let Some(track) = self.current() else {
            return Duration::ZERO;
        };

        let position = if self.paused || track.info.is_stream {
            self.position
        } else {
            self.position + self.position_at.elapsed()
        };

        if track.info.is_stream {
            position
        } else {
            position.min(track.duration())
        }
    }

    pub(crate) fn set_position(&mut self, position: Duration) {
        self.position = position;
        self.position_at = Instant::now();
    }

    /// Freezes the extrapolated position, used when pausing.
    pub(crate) fn pin_position(&mut self) {
        let position = self.position();
        self.set_position(position);
    }

    /// Watches the encoded handle of the last track the backend reported
    /// as started.
    pub(crate) fn started(&self) -> watch::Receiver<Option<String>> {
        self.started.subscribe()
    }

    /// Forgets the last start acknowledgement before a new track is sent.
    pub(crate) fn reset_started(&self) {
        self.started.send_replace(None);
    }

    /// Acknowledges a track start. Starts of anything but the current track
    /// are stale and ignored.
    pub(crate) fn acknowledge_start(&mut self, track: &Track) -> bool {
        if self.current().map(|c| c.encoded.as_str()) != Some(track.encoded.as_str()) {
            return false;
        }

        self.started.send_replace(Some(track.encoded.clone()));
        true
    }
}

/// Transitions over a queue. They never talk to the backend; callers run
/// them on a copy and commit it once the backend followed.
pub(crate) mod transition {
    use super::*;

    /// Queue head becomes current if nothing is. Returns the track to start.
    pub fn start_if_idle(queue: &mut Queue) -> Option<Track> {
        if queue.current().is_some() {
            return None;
        }

        queue.advance();
        queue.current().cloned()
    }

    /// Moves past the current track on user request. A queue loop keeps the
    /// skipped track in rotation, a track loop is bypassed.
    pub fn skip(queue: &mut Queue, loop_mode: LoopMode) -> Option<Track> {
        // Re-queued before advancing so a lone track comes straight back.
        if loop_mode == LoopMode::Queue {
            if let Some(current) = queue.current().cloned() {
                queue.push_back(current);
            }
        }

        if let Some(old) = queue.advance() {
            queue.remember(old);
        }

        queue.current().cloned()
    }

    /// Replays the most recent previous track; the interrupted one is put
    /// back at the front so it plays next.
    pub fn previous(queue: &mut Queue) -> Option<Track> {
        let prev = queue.take_previous()?;

        if let Some(interrupted) = queue.replace_current(Some(prev.clone())) {
            queue.push_front(interrupted);
        }

        Some(prev)
    }

    /// Applies the loop policy after the current track ended by itself.
    /// Returns the track to start next, `None` when the queue is exhausted.
    pub fn track_ended(queue: &mut Queue, loop_mode: LoopMode, reason: TrackEndReason) -> Option<Track> {
        if loop_mode == LoopMode::Track && reason == TrackEndReason::Finished {
            return queue.current().cloned();
        }

        skip(queue, loop_mode)
    }
}
